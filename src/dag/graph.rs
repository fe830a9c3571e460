// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::pipeline::{Pipeline, TaskId};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must finish before this one can start.
    deps: Vec<TaskId>,
    /// Direct dependents: tasks that wait for this one.
    dependents: Vec<TaskId>,
}

/// In-memory DAG keyed by task id.
///
/// Built from a validated [`Pipeline`]; acyclicity is checked there, so this
/// only keeps adjacency information for scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: BTreeMap<TaskId, DagNode>,
}

impl DagGraph {
    /// Build a DAG from the happens-before edges of `pipeline`.
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let mut nodes: BTreeMap<TaskId, DagNode> = pipeline
            .tasks()
            .into_iter()
            .map(|id| (id, DagNode::default()))
            .collect();

        for (before, after) in pipeline.edges() {
            if let Some(node) = nodes.get_mut(&after) {
                if !node.deps.contains(&before) {
                    node.deps.push(before);
                }
            }
            if let Some(node) = nodes.get_mut(&before) {
                if !node.dependents.contains(&after) {
                    node.dependents.push(after);
                }
            }
        }

        Self { nodes }
    }

    /// All task ids in the graph.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.nodes.contains_key(&task)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, task: TaskId) -> &[TaskId] {
        self.nodes
            .get(&task)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, task: TaskId) -> &[TaskId] {
        self.nodes
            .get(&task)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_members_depend_on_images_only() {
        let graph = DagGraph::from_pipeline(&Pipeline::build_flow());
        assert_eq!(graph.dependencies_of(TaskId::Sprite), &[TaskId::Images]);
        assert_eq!(graph.dependencies_of(TaskId::Clean), &[] as &[TaskId]);
        assert_eq!(graph.dependents_of(TaskId::Images).len(), 5);
    }

    #[test]
    fn server_waits_for_whole_parallel_group() {
        let graph = DagGraph::from_pipeline(&Pipeline::default_flow());
        let mut deps = graph.dependencies_of(TaskId::Server).to_vec();
        deps.sort();
        assert_eq!(
            deps,
            vec![
                TaskId::Styles,
                TaskId::Html,
                TaskId::Scripts,
                TaskId::Sprite,
                TaskId::CreateWebp
            ]
        );
    }
}
