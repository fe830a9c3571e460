// src/tasks/watcher.rs

use std::sync::Arc;

use tracing::info;

use crate::errors::{TaskError, TaskResult};
use crate::pipeline::TaskId;
use crate::tasks::{TaskContext, TaskReport};
use crate::watch::{WatchSettings, build_bindings, spawn_watcher};

/// Start watching the source tree.
///
/// Matching changes are sent back to the runtime as triggers for the bound
/// tasks. Returns once the watcher is installed.
pub async fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    if ctx.is_watching() {
        info!("watcher already running");
        return Ok(TaskReport::empty(TaskId::Watcher));
    }

    let bindings = build_bindings(&ctx.config.watch)?;
    if bindings.is_empty() {
        info!("no watch bindings configured; nothing to watch");
        return Ok(TaskReport::empty(TaskId::Watcher));
    }

    let settings = WatchSettings {
        root: ctx.paths.root.clone(),
        watch_dir: ctx.paths.source.clone(),
        bindings,
        use_hash: ctx.config.config.use_hash,
    };
    let handle = spawn_watcher(settings, Arc::clone(&ctx.fs), ctx.events.clone())
        .map_err(|e| TaskError::Other(e.context("starting file watcher")))?;
    ctx.set_watcher(handle);

    Ok(TaskReport::empty(TaskId::Watcher))
}
