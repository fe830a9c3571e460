// src/exec/task_runner.rs

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::TaskError;
use crate::pipeline::TaskId;
use crate::tasks::{self, TaskContext};

/// Run a single scheduled task and report its outcome to the runtime.
///
/// Task errors never escape: they are logged and turned into a `Failed` (or,
/// for a server bind error, `Fatal`) completion.
pub async fn run_scheduled(
    task: ScheduledTask,
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let ScheduledTask { task: id, run_id } = task;
    info!(task = %id, run_id, "starting task");
    let started = Instant::now();

    let outcome = match tasks::run_task(id, ctx).await {
        Ok(report) => {
            info!(
                task = %id,
                run_id,
                written = report.written.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            );
            TaskOutcome::Success
        }
        Err(err) => outcome_for_error(&err, id, run_id),
    };

    if let Err(e) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: id,
            run_id,
            outcome,
        })
        .await
    {
        warn!(task = %id, run_id, error = %e, "runtime gone; dropping completion");
    }
}

fn outcome_for_error(err: &TaskError, task: TaskId, run_id: u64) -> TaskOutcome {
    if err.is_fatal() {
        error!(task = %task, run_id, error = %err, "task failed fatally");
        TaskOutcome::Fatal
    } else {
        error!(task = %task, run_id, error = %format!("{err:#}"), "task failed");
        TaskOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;

    #[test]
    fn bind_error_is_fatal_everything_else_fails() {
        let bind = TaskError::Bind {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert_eq!(outcome_for_error(&bind, TaskId::Server, 1), TaskOutcome::Fatal);

        let transform = TaskError::transform(TaskId::Styles, "expected \"}\"");
        assert_eq!(outcome_for_error(&transform, TaskId::Styles, 1), TaskOutcome::Failed);
    }
}
