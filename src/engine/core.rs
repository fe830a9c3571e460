// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - reloading browsers through the dev server
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! network.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{CoreState, CoreStep, handle_completion, handle_trigger};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// This owns:
/// - the DAG scheduler
/// - the trigger queue
/// - the reload flag of the active run
/// - runtime options (e.g. `exit_when_idle`)
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    active_reload: bool,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            active_reload: false,
            options,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::Triggered(trigger) => handle_trigger(self.state(), trigger),
            RuntimeEvent::TaskCompleted {
                task,
                run_id,
                outcome,
            } => handle_completion(self.state(), task, run_id, outcome),
            RuntimeEvent::ShutdownRequested => CoreStep::stop(),
        }
    }

    fn state(&mut self) -> CoreState<'_> {
        CoreState {
            scheduler: &mut self.scheduler,
            queue: &mut self.queue,
            active_reload: &mut self.active_reload,
            options: &self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::ScheduledTask;
    use crate::engine::{CoreCommand, TaskOutcome, Trigger};
    use crate::pipeline::{Pipeline, TaskId};

    fn core(exit_when_idle: bool) -> CoreRuntime {
        CoreRuntime::new(
            Scheduler::from_pipeline(&Pipeline::default_flow()),
            TriggerWhileRunningBehaviour::Queue,
            1,
            RuntimeOptions { exit_when_idle },
        )
    }

    fn dispatched(step: &CoreStep) -> Vec<ScheduledTask> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(t) => Some(t.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn complete(task: TaskId, run_id: u64, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task,
            run_id,
            outcome,
        }
    }

    #[test]
    fn one_shot_run_requests_exit_after_finishing() {
        let mut core = core(true);
        let step = core.step(RuntimeEvent::Triggered(Trigger::manual(vec![TaskId::Html])));
        assert_eq!(dispatched(&step).len(), 1);
        assert!(step.keep_running);

        let step = core.step(complete(TaskId::Html, 1, TaskOutcome::Success));
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::RequestExit));
    }

    #[test]
    fn retrigger_of_running_task_is_queued_with_reload() {
        let mut core = core(false);
        core.step(RuntimeEvent::Triggered(Trigger::manual(vec![TaskId::Html])));
        let step = core.step(RuntimeEvent::Triggered(Trigger::file_watch(
            vec![TaskId::Html],
            true,
        )));
        assert!(step.commands.is_empty());
        assert!(!core.queue_is_empty());

        let step = core.step(complete(TaskId::Html, 1, TaskOutcome::Success));
        let finished = step.commands.iter().find_map(|c| match c {
            CoreCommand::RunFinished { reload, .. } => Some(*reload),
            _ => None,
        });
        assert_eq!(finished, Some(false));
        let next = dispatched(&step);
        assert_eq!(next, vec![ScheduledTask { task: TaskId::Html, run_id: 2 }]);

        let step = core.step(complete(TaskId::Html, 2, TaskOutcome::Success));
        assert!(step.commands.contains(&CoreCommand::RunFinished {
            summary: crate::dag::RunSummary {
                run_id: 2,
                succeeded: vec![TaskId::Html],
                failed: vec![],
                skipped: vec![],
            },
            reload: true,
        }));
    }

    #[test]
    fn queue_length_two_runs_retriggers_separately() {
        let mut core = CoreRuntime::new(
            Scheduler::from_pipeline(&Pipeline::default_flow()),
            TriggerWhileRunningBehaviour::Queue,
            2,
            RuntimeOptions {
                exit_when_idle: false,
            },
        );
        core.step(RuntimeEvent::Triggered(Trigger::manual(vec![TaskId::Styles])));
        for _ in 0..2 {
            core.step(RuntimeEvent::Triggered(Trigger::file_watch(
                vec![TaskId::Styles],
                false,
            )));
        }

        let step = core.step(complete(TaskId::Styles, 1, TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec![ScheduledTask { task: TaskId::Styles, run_id: 2 }]);
        let step = core.step(complete(TaskId::Styles, 2, TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec![ScheduledTask { task: TaskId::Styles, run_id: 3 }]);
        let step = core.step(complete(TaskId::Styles, 3, TaskOutcome::Success));
        assert!(dispatched(&step).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn fatal_completion_aborts() {
        let mut core = core(false);
        core.step(RuntimeEvent::Triggered(Trigger::manual(vec![
            TaskId::Server,
            TaskId::Watcher,
        ])));
        let step = core.step(complete(TaskId::Server, 1, TaskOutcome::Fatal));
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::Abort { task: TaskId::Server }));
    }

    #[test]
    fn completion_from_old_run_is_ignored() {
        let mut core = core(false);
        core.step(RuntimeEvent::Triggered(Trigger::manual(vec![TaskId::Styles])));
        let step = core.step(complete(TaskId::Styles, 7, TaskOutcome::Success));
        assert!(step.commands.is_empty());
        assert!(!core.is_idle());
    }

    #[test]
    fn shutdown_stops_loop() {
        let mut core = core(false);
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
    }
}
