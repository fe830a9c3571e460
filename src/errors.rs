// src/errors.rs

//! Crate-wide error types.
//!
//! [`SitepipeError`] covers configuration and pipeline construction;
//! [`TaskError`] is what a single task invocation reports back to the
//! executor, which turns it into a failed completion instead of letting it
//! escape into the runtime loop.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::TaskId;

#[derive(Error, Debug)]
pub enum SitepipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Invalid pipeline: {0}")]
    Pipeline(String),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Task '{0}' failed fatally; aborting")]
    Aborted(TaskId),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single task invocation.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The wrapped transformation (compiler, minifier, codec) rejected its input.
    #[error("{task}: {message}")]
    Transform { task: TaskId, message: String },

    #[error("{task}: IO error on {path:?}: {source}")]
    Io {
        task: TaskId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dev server could not bind its listener.
    #[error("server: failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    pub fn transform(task: TaskId, message: impl Into<String>) -> Self {
        TaskError::Transform {
            task,
            message: message.into(),
        }
    }

    pub fn io(task: TaskId, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io {
            task,
            path: path.into(),
            source,
        }
    }

    /// Fatal errors abort the whole flow; everything else only fails the task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskError::Bind { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitepipeError>;
pub type TaskResult<T> = std::result::Result<T, TaskError>;
