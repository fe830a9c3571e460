use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use sitepipe::dag::ScheduledTask;
use sitepipe::engine::{RuntimeEvent, TaskOutcome};
use sitepipe::errors::Result;
use sitepipe::exec::ExecutorBackend;
use sitepipe::pipeline::TaskId;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - immediately reports `TaskCompleted` for each scheduled task, with
///   `Failed`/`Fatal` for tasks configured to fail and `Success` otherwise.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<TaskId>>>,
    failing: HashSet<TaskId>,
    fatal: HashSet<TaskId>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<TaskId>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
            fatal: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: TaskId) -> Self {
        self.failing.insert(task);
        self
    }

    pub fn fatal(mut self, task: TaskId) -> Self {
        self.fatal.insert(task);
        self
    }

    fn outcome_for(&self, task: TaskId) -> TaskOutcome {
        if self.fatal.contains(&task) {
            TaskOutcome::Fatal
        } else if self.failing.contains(&task) {
            TaskOutcome::Failed
        } else {
            TaskOutcome::Success
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let completions: Vec<_> = tasks
            .into_iter()
            .map(|t| (t, self.outcome_for(t.task)))
            .collect();

        Box::pin(async move {
            for (t, outcome) in completions {
                executed.lock().unwrap().push(t.task);

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.task,
                    run_id: t.run_id,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
