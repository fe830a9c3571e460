// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::pipeline::TaskId;
use crate::types::TriggerWhileRunningBehaviour;

/// A batch of tasks that should run together in a future run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueuedBatch {
    pub tasks: BTreeSet<TaskId>,
    pub reload: bool,
}

impl QueuedBatch {
    fn merge(&mut self, tasks: &[TaskId], reload: bool) {
        self.tasks.extend(tasks.iter().copied());
        self.reload |= reload;
    }
}

/// Queue of triggers that arrive while a run is already executing.
///
/// - Each queued entry is a batch of tasks for a future run; batches run one
///   after another, oldest first.
/// - `queue_length` (max_runs) bounds how many batches are kept. Once full,
///   further triggers are merged into the newest batch, so nothing is lost.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<QueuedBatch>,
}

impl TriggerQueue {
    /// Create a new queue with the given behaviour and maximum queued runs.
    ///
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of batches waiting for a run.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Record tasks triggered while a run is in progress.
    ///
    /// - `Queue`: open a new batch while below `queue_length`, otherwise
    ///   merge into the newest one.
    /// - `Cancel`: drop everything queued and keep only this batch.
    pub fn record_trigger(&mut self, tasks: &[TaskId], reload: bool) {
        if tasks.is_empty() {
            return;
        }

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if self.runs.len() < self.max_runs {
                    let mut batch = QueuedBatch::default();
                    batch.merge(tasks, reload);
                    self.runs.push_back(batch);
                    debug!(?tasks, reload, queued = self.runs.len(), "queued new batch");
                } else if let Some(last) = self.runs.back_mut() {
                    last.merge(tasks, reload);
                    debug!(
                        ?tasks,
                        reload,
                        max_runs = self.max_runs,
                        "queue_length reached; merged into newest batch"
                    );
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(?tasks, "resetting queued batches to this trigger only");
                self.runs.clear();
                let mut batch = QueuedBatch::default();
                batch.merge(tasks, reload);
                self.runs.push_back(batch);
            }
        }
    }

    /// Take the oldest queued batch for the next run.
    ///
    /// Returns `None` when nothing was queued.
    pub fn next_batch(&mut self) -> Option<QueuedBatch> {
        let batch = self.runs.pop_front()?;
        debug!(
            tasks = batch.tasks.len(),
            remaining = self.runs.len(),
            "took queued batch for new run"
        );
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_coalesces_and_ors_reload() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        q.record_trigger(&[TaskId::Styles], false);
        q.record_trigger(&[TaskId::Html], true);
        q.record_trigger(&[TaskId::Styles], false);

        let batch = q.next_batch().unwrap();
        assert_eq!(
            batch.tasks.into_iter().collect::<Vec<_>>(),
            vec![TaskId::Styles, TaskId::Html]
        );
        assert!(batch.reload);
        assert!(q.is_empty());
    }

    #[test]
    fn longer_queue_keeps_triggers_in_separate_runs() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
        q.record_trigger(&[TaskId::Styles], false);
        q.record_trigger(&[TaskId::Html], true);
        q.record_trigger(&[TaskId::Scripts], false);
        assert_eq!(q.len(), 2);

        let first = q.next_batch().unwrap();
        assert_eq!(first.tasks.into_iter().collect::<Vec<_>>(), vec![TaskId::Styles]);
        assert!(!first.reload);

        // The overflow trigger joined the newest batch.
        let second = q.next_batch().unwrap();
        assert_eq!(
            second.tasks.into_iter().collect::<Vec<_>>(),
            vec![TaskId::Html, TaskId::Scripts]
        );
        assert!(second.reload);
        assert!(q.next_batch().is_none());
    }

    #[test]
    fn cancel_mode_keeps_latest_only() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 3);
        q.record_trigger(&[TaskId::Styles], false);
        q.record_trigger(&[TaskId::Scripts], false);

        let batch = q.next_batch().unwrap();
        assert_eq!(
            batch.tasks.into_iter().collect::<Vec<_>>(),
            vec![TaskId::Scripts]
        );
    }

    #[test]
    fn empty_queue_drains_to_none() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        assert!(q.next_batch().is_none());
        q.record_trigger(&[], true);
        assert!(q.is_empty());
    }
}
