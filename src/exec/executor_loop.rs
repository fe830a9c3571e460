// src/exec/executor_loop.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_scheduled;
use crate::tasks::TaskContext;

/// Spawn the background executor loop.
///
/// Each scheduled task runs in its own tokio task, so members of a parallel
/// group proceed concurrently. The scheduler never dispatches a task twice
/// within a run, so no per-task bookkeeping is needed here.
pub fn spawn_executor(
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(task) = rx.recv().await {
            let ctx = Arc::clone(&ctx);
            let rt_tx = runtime_tx.clone();
            tokio::spawn(async move {
                let name = task.task;
                run_scheduled(task, ctx, rt_tx).await;
                debug!(task = %name, "task runner future finished");
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
