// src/engine/mod.rs

//! Orchestration engine for sitepipe.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the main runtime event loop that reacts to:
//!   - startup and file-watch triggers
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::pipeline::TaskId;

/// Outcome of a task invocation for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task failed; dependents still run.
    Failed,
    /// The task failed in a way that aborts the whole flow.
    Fatal,
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Initial tasks of the selected target at startup.
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// A set of tasks that should run together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub tasks: Vec<TaskId>,
    /// Whether connected browsers reload once the run that executes these
    /// tasks has finished.
    pub reload: bool,
    pub reason: TriggerReason,
}

impl Trigger {
    pub fn manual(tasks: Vec<TaskId>) -> Self {
        Self {
            tasks,
            reload: false,
            reason: TriggerReason::Manual,
        }
    }

    pub fn file_watch(tasks: Vec<TaskId>, reload: bool) -> Self {
        Self {
            tasks,
            reload,
            reason: TriggerReason::FileWatch,
        }
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the DAG is idle and there are no
    /// queued triggers (one-shot targets such as `build`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, executor, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Tasks should be (logically) triggered.
    Triggered(Trigger),
    /// A task invocation finished with a concrete outcome.
    TaskCompleted {
        task: TaskId,
        run_id: u64,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::{QueuedBatch, TriggerQueue};
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::{Runtime, RuntimeReport};
