// src/dag/scheduler.rs

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::{RunSummary, SchedulerStep};
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::TaskOutcome;
use crate::pipeline::{Pipeline, TaskId};

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// A run is seeded by a set of triggered tasks. Only those tasks execute;
/// the DAG orders them relative to each other. A failed task still releases
/// its dependents, while a fatal failure skips them.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: BTreeMap<TaskId, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`Pipeline`].
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let graph = DagGraph::from_pipeline(pipeline);

        let tasks = graph
            .tasks()
            .map(|id| {
                let deps = graph.dependencies_of(id).to_vec();
                (id, TaskInfo::new(id, deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Whether `task` is part of the pipeline this scheduler was built from.
    pub fn knows(&self, task: TaskId) -> bool {
        self.tasks.contains_key(&task)
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: TaskId) -> Option<TaskRunState> {
        let info = self.tasks.get(&task)?;
        Some(info.run_state.into())
    }

    /// Start a new run, resetting per-run state but keeping history.
    pub fn start_new_run(&mut self) -> u64 {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
        self.run_counter
    }

    /// Handle a trigger for a set of tasks (production API).
    pub fn handle_trigger(&mut self, tasks: &[TaskId]) -> Vec<ScheduledTask> {
        self.trigger_step_internal(tasks).newly_scheduled
    }

    /// Handle completion of a task with a concrete outcome (production API).
    pub fn handle_completion(&mut self, task: TaskId, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Manual-step variant of `handle_trigger`.
    pub fn step_trigger(&mut self, tasks: &[TaskId]) -> SchedulerStep {
        self.trigger_step_internal(tasks)
    }

    /// Manual-step variant of `handle_completion`.
    pub fn step_completion(&mut self, task: TaskId, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// If every participating task is terminal, close the run and return its
    /// summary.
    fn maybe_finish_run(&mut self) -> Option<RunSummary> {
        self.current_run_id?;

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if !manager.all_tasks_terminal() {
            return None;
        }

        let summary = manager.summary();
        info!(
            run_id = summary.run_id,
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped.len(),
            "scheduler: all tasks terminal; run finished"
        );
        self.current_run_id = None;
        Some(summary)
    }

    fn trigger_step_internal(&mut self, tasks: &[TaskId]) -> SchedulerStep {
        if self.current_run_id.is_none() {
            self.start_new_run();
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        for &task in tasks {
            manager.mark_pending(task);
        }
        let newly_scheduled = manager.collect_new_ready_tasks();
        let finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_skipped: Vec::new(),
            finished,
        }
    }

    fn completion_step_internal(&mut self, task: TaskId, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let Some(info) = self.tasks.get_mut(&task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return SchedulerStep::default();
        };

        if info.run_state != Some(RunState::Running) {
            warn!(
                task = %task,
                state = ?info.run_state,
                "completion for task that is not running; ignoring"
            );
            return SchedulerStep::default();
        }

        let mut newly_skipped = Vec::new();
        match outcome {
            TaskOutcome::Success => {
                info.run_state = Some(RunState::DoneSuccess);
                info.last_successful_run = Some(run_id);
                debug!(task = %task, run_id, "task completed successfully");
            }
            TaskOutcome::Failed => {
                info.run_state = Some(RunState::DoneFailed);
                info.last_failed_run = Some(run_id);
                warn!(task = %task, run_id, "task failed; dependents still run");
            }
            TaskOutcome::Fatal => {
                info.run_state = Some(RunState::DoneFailed);
                info.last_failed_run = Some(run_id);
                warn!(task = %task, run_id, "task failed fatally; skipping dependents");
                let mut manager =
                    StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                newly_skipped = manager.mark_dependents_skipped(task);
            }
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_skipped,
            finished,
        }
    }
}
