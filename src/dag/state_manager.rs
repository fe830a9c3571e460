// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::scheduler_step::RunSummary;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::pipeline::TaskId;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut BTreeMap<TaskId, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut BTreeMap<TaskId, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include a triggered task in this run.
    ///
    /// Only the task itself joins the run; its dependents are not pulled in.
    /// Returns `false` if the task was already participating.
    pub fn mark_pending(&mut self, task: TaskId) -> bool {
        match self.tasks.get_mut(&task) {
            Some(info) if info.run_state.is_none() => {
                info.run_state = Some(RunState::Pending);
                debug!(task = %task, "marked Pending for this run");
                true
            }
            Some(_) => {
                debug!(
                    task = %task,
                    "task already participating in current run; ignoring additional trigger"
                );
                false
            }
            None => {
                warn!(task = %task, "trigger for task outside the pipeline; ignoring");
                false
            }
        }
    }

    /// Mark all participating dependents (transitively) of a fatally failed
    /// task as `Skipped`.
    ///
    /// Returns the list of tasks that were newly skipped.
    pub fn mark_dependents_skipped(&mut self, failed_task: TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_skipped = Vec::new();

        while let Some(id) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&id) {
                match info.run_state {
                    Some(RunState::Pending) => {
                        info.run_state = Some(RunState::Skipped);
                        debug!(task = %id, "skipping dependent due to fatal upstream failure");
                        newly_skipped.push(id);
                        stack.extend(self.graph.dependents_of(id).iter().copied());
                    }
                    // Not participating, or already started/finished.
                    _ => {}
                }
            }
        }

        newly_skipped
    }

    /// Collect tasks that are `Pending` and whose dependencies are satisfied,
    /// mark them as `Running`, and return them as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let run_id = self.current_run_id.unwrap_or(0);

        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<TaskId> = {
            let ro = ReadOnlyStateManager::new(self.tasks);
            self.tasks
                .values()
                .filter(|info| {
                    matches!(info.run_state, Some(RunState::Pending))
                        && ro.deps_satisfied_for_info(info)
                })
                .map(|info| info.id)
                .collect()
        };

        let mut ready = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(info) = self.tasks.get_mut(&id) {
                if info.has_run_before() {
                    info!(task = %id, run_id, "scheduling task for re-run");
                } else {
                    info!(task = %id, run_id, "scheduling task for first run");
                }
                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask { task: id, run_id });
            }
        }

        ready
    }

    /// Check if all participating tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks
            .values()
            .all(|info| info.run_state.is_none_or(|s| s.is_terminal()))
    }

    /// Summarise the current run from per-task states.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            run_id: self.current_run_id.unwrap_or(0),
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        };
        for info in self.tasks.values() {
            match info.run_state {
                Some(RunState::DoneSuccess) => summary.succeeded.push(info.id),
                Some(RunState::DoneFailed) => summary.failed.push(info.id),
                Some(RunState::Skipped) => summary.skipped.push(info.id),
                _ => {}
            }
        }
        summary
    }
}

/// A read-only view of the task map for checking dependency satisfaction.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a BTreeMap<TaskId, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a BTreeMap<TaskId, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Determine whether all dependencies of the given task are satisfied for
    /// the *current run*.
    ///
    /// A dependency blocks only while it is `Pending` or `Running` in this
    /// run. A dependency that finished (successfully or not) releases its
    /// dependents, and one that is not part of the run is ignored.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_id| match self.tasks.get(dep_id) {
            Some(dep) => match dep.run_state {
                Some(RunState::Pending) | Some(RunState::Running) => false,
                Some(RunState::Skipped) => false,
                Some(RunState::DoneSuccess) | Some(RunState::DoneFailed) | None => true,
            },
            None => {
                warn!(task = %info.id, dep = %dep_id, "dependency missing from tasks map");
                false
            }
        })
    }
}
