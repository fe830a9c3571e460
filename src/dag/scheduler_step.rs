// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::pipeline::TaskId;

/// What happened in a run that just finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: u64,
    pub succeeded: Vec<TaskId>,
    pub failed: Vec<TaskId>,
    /// Tasks that never started because of a fatal upstream failure.
    pub skipped: Vec<TaskId>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the DAG and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks that were skipped in this step because of a fatal failure.
    pub newly_skipped: Vec<TaskId>,
    /// Set when this step finished the current run.
    pub finished: Option<RunSummary>,
}
