// src/tasks/clean.rs

use tracing::{debug, info};

use crate::errors::TaskResult;
use crate::pipeline::TaskId;
use crate::tasks::{TaskContext, TaskReport};

/// Remove the build directory recursively. A missing directory is a no-op.
pub fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    let build = &ctx.paths.build;
    if ctx.fs.remove_dir_all(build)? {
        info!(dir = ?build, "removed build directory");
    } else {
        debug!(dir = ?build, "build directory absent; nothing to clean");
    }
    Ok(TaskReport::empty(TaskId::Clean))
}
