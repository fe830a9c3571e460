// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, warn};

use crate::dag::{RunSummary, ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskOutcome, Trigger};
use crate::pipeline::TaskId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// A run finished; reload connected browsers if `reload` is set.
    RunFinished { summary: RunSummary, reload: bool },
    /// A task failed fatally; stop everything and report an error.
    Abort { task: TaskId },
    /// Request that the process exits (one-shot targets when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub fn stop() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: false,
        }
    }
}

/// Mutable state shared by the handlers.
#[derive(Debug)]
pub struct CoreState<'a> {
    pub scheduler: &'a mut Scheduler,
    pub queue: &'a mut TriggerQueue,
    /// Reload flag accumulated for the active run.
    pub active_reload: &'a mut bool,
    pub options: &'a RuntimeOptions,
}

/// Handle a trigger event.
///
/// - If the scheduler is idle, start a new run seeded with this trigger plus
///   anything that was already queued.
/// - If a run is active:
///   - tasks not in the run are merged into it immediately,
///   - tasks still `Pending` absorb the trigger (they have not read their
///     inputs yet),
///   - tasks that already started or finished are queued for a future run.
pub fn handle_trigger(state: CoreState<'_>, trigger: Trigger) -> CoreStep {
    let mut tasks: Vec<TaskId> = Vec::with_capacity(trigger.tasks.len());
    for task in trigger.tasks {
        if !state.scheduler.knows(task) {
            warn!(task = %task, "trigger for task outside the pipeline; ignoring");
        } else if !tasks.contains(&task) {
            tasks.push(task);
        }
    }
    debug!(?tasks, reason = ?trigger.reason, reload = trigger.reload, "handling trigger");

    let mut commands = Vec::new();

    if state.scheduler.is_idle() {
        let mut reload = trigger.reload;
        if let Some(batch) = state.queue.next_batch() {
            for task in batch.tasks {
                if !tasks.contains(&task) {
                    tasks.push(task);
                }
            }
            reload |= batch.reload;
        }
        *state.active_reload = reload;
        commands.extend(start_new_run(state.scheduler, &tasks));
        let keep_running = !exit_if_idle(&state, &mut commands);
        return CoreStep {
            commands,
            keep_running,
        };
    }

    let mut merge = Vec::new();
    let mut queued = Vec::new();
    for task in tasks {
        match state.scheduler.run_state_of(task) {
            Some(TaskRunState::NotInRun) => merge.push(task),
            Some(TaskRunState::Pending) => {
                debug!(task = %task, "task not started yet; trigger absorbed by current run");
                *state.active_reload |= trigger.reload;
            }
            Some(_) => queued.push(task),
            None => {}
        }
    }

    if !merge.is_empty() {
        *state.active_reload |= trigger.reload;
        let ready = state.scheduler.handle_trigger(&merge);
        if !ready.is_empty() {
            commands.push(CoreCommand::DispatchTasks(ready));
        }
    }

    if !queued.is_empty() {
        state.queue.record_trigger(&queued, trigger.reload);
    }

    CoreStep::continue_with(commands)
}

/// Handle a task completion event.
pub fn handle_completion(
    mut state: CoreState<'_>,
    task: TaskId,
    run_id: u64,
    outcome: TaskOutcome,
) -> CoreStep {
    if state.scheduler.current_run_id() != Some(run_id) {
        warn!(
            task = %task,
            run_id,
            current = ?state.scheduler.current_run_id(),
            "completion for a run that is not active; ignoring"
        );
        return CoreStep::continue_with(Vec::new());
    }

    let mut commands = Vec::new();
    let step = state.scheduler.handle_completion(task, outcome);

    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    if let Some(summary) = step.finished {
        commands.push(CoreCommand::RunFinished {
            summary,
            reload: *state.active_reload,
        });
        *state.active_reload = false;
    }

    if outcome == TaskOutcome::Fatal {
        commands.push(CoreCommand::Abort { task });
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    commands.extend(maybe_start_queued_run(&mut state));

    let keep_running = !exit_if_idle(&state, &mut commands);
    CoreStep {
        commands,
        keep_running,
    }
}

/// Seed a new run from a set of triggered tasks.
///
/// This is pure and returns commands instead of performing IO.
pub fn start_new_run(scheduler: &mut Scheduler, tasks: &[TaskId]) -> Vec<CoreCommand> {
    if tasks.is_empty() {
        return Vec::new();
    }

    scheduler.start_new_run();
    let ready = scheduler.handle_trigger(tasks);
    if ready.is_empty() {
        Vec::new()
    } else {
        vec![CoreCommand::DispatchTasks(ready)]
    }
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(state: &mut CoreState<'_>) -> Vec<CoreCommand> {
    if !state.scheduler.is_idle() {
        return Vec::new();
    }
    let Some(batch) = state.queue.next_batch() else {
        return Vec::new();
    };

    *state.active_reload = batch.reload;
    let tasks: Vec<TaskId> = batch.tasks.into_iter().collect();
    start_new_run(state.scheduler, &tasks)
}

/// Push `RequestExit` when the runtime should stop because nothing is left
/// to do. Returns `true` if it did.
fn exit_if_idle(state: &CoreState<'_>, commands: &mut Vec<CoreCommand>) -> bool {
    if state.options.exit_when_idle && state.scheduler.is_idle() && state.queue.is_empty() {
        commands.push(CoreCommand::RequestExit);
        true
    } else {
        false
    }
}
