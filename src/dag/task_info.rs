// src/dag/task_info.rs

//! Task metadata and per-run state.

use crate::pipeline::TaskId;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Task was triggered for this run but is waiting on dependencies.
    Pending,
    /// Task has been dispatched to the executor and is currently running.
    Running,
    /// Task completed successfully in this run.
    DoneSuccess,
    /// Task failed in this run. Its dependents still run.
    DoneFailed,
    /// Task never started because an upstream task failed fatally.
    Skipped,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }
}

/// Public, read-only view of a task's per-run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not participating in the current run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Skipped,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
            Some(RunState::Skipped) => TaskRunState::Skipped,
        }
    }
}

/// Static task information derived from the pipeline, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    /// Direct dependencies for this task.
    pub deps: Vec<TaskId>,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,

    /// Last run ID in which this task succeeded.
    pub last_successful_run: Option<u64>,

    /// Last run ID in which this task failed.
    pub last_failed_run: Option<u64>,
}

impl TaskInfo {
    pub fn new(id: TaskId, deps: Vec<TaskId>) -> Self {
        Self {
            id,
            deps,
            run_state: None,
            last_successful_run: None,
            last_failed_run: None,
        }
    }

    /// Whether the task has run before in this process.
    pub fn has_run_before(&self) -> bool {
        self.last_successful_run.is_some() || self.last_failed_run.is_some()
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub task: TaskId,
    /// All tasks that belong to the same run share the same `run_id`.
    pub run_id: u64,
}
