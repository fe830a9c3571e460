// src/pipeline/mod.rs

//! Task registry and pipeline composition.
//!
//! - [`TaskId`] is the closed set of tasks this tool knows how to run.
//! - [`flow`] composes tasks into series/parallel trees and derives the
//!   happens-before edges used by the scheduler.

pub mod flow;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::SitepipeError;

pub use flow::{Pipeline, Target};

/// Identifier of a build task.
///
/// Tasks are resolved by matching on this enum, so a misspelled task name
/// fails when the CLI argument or TOML file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum TaskId {
    Clean,
    Copy,
    Images,
    Styles,
    Html,
    Scripts,
    Sprite,
    CreateWebp,
    Server,
    Watcher,
}

impl TaskId {
    pub const ALL: [TaskId; 10] = [
        TaskId::Clean,
        TaskId::Copy,
        TaskId::Images,
        TaskId::Styles,
        TaskId::Html,
        TaskId::Scripts,
        TaskId::Sprite,
        TaskId::CreateWebp,
        TaskId::Server,
        TaskId::Watcher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::Clean => "clean",
            TaskId::Copy => "copy",
            TaskId::Images => "images",
            TaskId::Styles => "styles",
            TaskId::Html => "html",
            TaskId::Scripts => "scripts",
            TaskId::Sprite => "sprite",
            TaskId::CreateWebp => "createWebp",
            TaskId::Server => "server",
            TaskId::Watcher => "watcher",
        }
    }

    /// Tasks whose outputs are pushed to connected browsers after writing.
    pub fn streams_output(&self) -> bool {
        matches!(self, TaskId::Styles | TaskId::Scripts)
    }

    /// Tasks that transform source files into build outputs and can
    /// therefore be bound to watch patterns.
    pub fn is_transform(&self) -> bool {
        !matches!(self, TaskId::Clean | TaskId::Server | TaskId::Watcher)
    }

    /// Tasks that keep something alive after they complete.
    pub fn keeps_process_alive(&self) -> bool {
        matches!(self, TaskId::Server | TaskId::Watcher)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = SitepipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| SitepipeError::UnknownTask(s.to_string()))
    }
}

impl TryFrom<String> for TaskId {
    type Error = SitepipeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
