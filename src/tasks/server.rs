// src/tasks/server.rs

use tracing::{debug, info};

use crate::errors::TaskResult;
use crate::pipeline::TaskId;
use crate::tasks::{TaskContext, TaskReport};

/// Start the dev server over the build directory.
///
/// Completes as soon as the listener is bound; serving continues in the
/// background until shutdown. A bind failure is fatal for the whole flow.
pub async fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    if ctx.server.is_running() {
        info!("dev server already running");
        return Ok(TaskReport::empty(TaskId::Server));
    }

    let addr = ctx.server.start().await?;
    let url = format!("http://{addr}/");
    if ctx.config.server.log_startup {
        info!(%url, "serving {:?}", ctx.paths.build);
    } else {
        debug!(%url, "serving {:?}", ctx.paths.build);
    }
    Ok(TaskReport::empty(TaskId::Server))
}
