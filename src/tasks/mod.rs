// src/tasks/mod.rs

//! The build tasks themselves.
//!
//! File-level tasks (`clean`, `copy`, `images`, ...) are synchronous and run
//! on the blocking pool; `server` and `watcher` are async and return once
//! their background work has started. All of them share one
//! [`TaskContext`].

pub mod clean;
pub mod copy;
pub mod html;
pub mod images;
pub mod scripts;
pub mod server;
pub mod sprite;
pub mod styles;
pub mod svg;
pub mod watcher;
pub mod webp;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::ConfigFile;
use crate::engine::RuntimeEvent;
use crate::errors::{TaskError, TaskResult};
use crate::fs::FileSystem;
use crate::pipeline::TaskId;
use crate::server::DevServer;
use crate::watch::WatcherHandle;

/// Absolute project locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub source: PathBuf,
    pub build: PathBuf,
}

impl ProjectPaths {
    pub fn resolve(root: impl Into<PathBuf>, config: &ConfigFile) -> Self {
        let root = root.into();
        Self {
            source: root.join(&config.paths.source),
            build: root.join(&config.paths.build),
            root,
        }
    }
}

/// Everything a task needs to do its work.
#[derive(Debug)]
pub struct TaskContext {
    pub config: ConfigFile,
    pub paths: ProjectPaths,
    pub fs: Arc<dyn FileSystem>,
    pub server: Arc<DevServer>,
    /// Where the watcher sends its triggers.
    pub events: mpsc::Sender<RuntimeEvent>,
    watcher: Mutex<Option<WatcherHandle>>,
}

impl TaskContext {
    pub fn new(
        config: ConfigFile,
        paths: ProjectPaths,
        fs: Arc<dyn FileSystem>,
        server: Arc<DevServer>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            config,
            paths,
            fs,
            server,
            events,
            watcher: Mutex::new(None),
        }
    }

    fn watcher_slot(&self) -> MutexGuard<'_, Option<WatcherHandle>> {
        self.watcher.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher_slot().is_some()
    }

    pub(crate) fn set_watcher(&self, handle: WatcherHandle) {
        if let Some(previous) = self.watcher_slot().replace(handle) {
            previous.stop();
        }
    }

    /// Stop the watch loop, if one was started.
    pub fn stop_watching(&self) {
        if let Some(handle) = self.watcher_slot().take() {
            handle.stop();
        }
    }

    /// Read a single entry file, reporting a missing file as an IO error.
    pub(crate) fn read_entry(&self, task: TaskId, path: &Path) -> TaskResult<Vec<u8>> {
        if !self.fs.is_file(path) {
            return Err(TaskError::io(
                task,
                path,
                io::Error::new(io::ErrorKind::NotFound, "entry file not found"),
            ));
        }
        Ok(self.fs.read(path)?)
    }

    pub(crate) fn write_output(&self, path: &Path, contents: &[u8]) -> TaskResult<()> {
        self.fs.write(path, contents)?;
        debug!(path = ?path, bytes = contents.len(), "wrote output");
        Ok(())
    }
}

/// Files a task wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: TaskId,
    pub written: Vec<PathBuf>,
}

impl TaskReport {
    pub fn new(task: TaskId, written: Vec<PathBuf>) -> Self {
        Self { task, written }
    }

    pub fn empty(task: TaskId) -> Self {
        Self::new(task, Vec::new())
    }

    /// Written paths relative to `build`, with forward slashes.
    pub fn build_relative(&self, build: &Path) -> Vec<String> {
        self.written
            .iter()
            .filter_map(|p| p.strip_prefix(build).ok())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect()
    }
}

/// Run one task to completion.
///
/// Styles and scripts stream their outputs to the dev server afterwards.
pub async fn run_task(task: TaskId, ctx: Arc<TaskContext>) -> TaskResult<TaskReport> {
    match task {
        TaskId::Server => server::run(&ctx).await,
        TaskId::Watcher => watcher::run(&ctx).await,
        file_task => {
            let blocking_ctx = Arc::clone(&ctx);
            let report = tokio::task::spawn_blocking(move || run_file_task(file_task, &blocking_ctx))
                .await
                .map_err(|e| TaskError::Other(anyhow!("task {file_task} panicked: {e}")))??;

            if file_task.streams_output() {
                ctx.server.stream(report.build_relative(&ctx.paths.build));
            }
            Ok(report)
        }
    }
}

/// Run a synchronous file-level task on the current thread.
pub fn run_file_task(task: TaskId, ctx: &TaskContext) -> TaskResult<TaskReport> {
    match task {
        TaskId::Clean => clean::run(ctx),
        TaskId::Copy => copy::run(ctx),
        TaskId::Images => images::run(ctx),
        TaskId::Styles => styles::run(ctx),
        TaskId::Html => html::run(ctx),
        TaskId::Scripts => scripts::run(ctx),
        TaskId::Sprite => sprite::run(ctx),
        TaskId::CreateWebp => webp::run(ctx),
        TaskId::Server | TaskId::Watcher => Err(TaskError::Other(anyhow!(
            "{task} is not a file task"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::server::ServerSettings;

    /// Context over an in-memory filesystem rooted at `/site`.
    pub fn mock_context(fs: Arc<MockFileSystem>) -> TaskContext {
        mock_context_with(fs, ConfigFile::builtin())
    }

    pub fn mock_context_with(fs: Arc<MockFileSystem>, config: ConfigFile) -> TaskContext {
        let paths = ProjectPaths::resolve("/site", &config);
        let server = Arc::new(DevServer::new(ServerSettings::from_config(
            &config,
            paths.build.clone(),
        )));
        let (tx, _rx) = mpsc::channel(8);
        TaskContext::new(config, paths, fs, server, tx)
    }
}
