// src/pipeline/flow.rs

use std::collections::HashSet;
use std::fmt;

use clap::ValueEnum;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, SitepipeError};
use crate::pipeline::TaskId;

/// A composition tree of tasks.
///
/// - `Series`: each member starts only after the previous one completed.
/// - `Parallel`: all members start together; the group completes when every
///   member has completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pipeline {
    Task(TaskId),
    Series(Vec<Pipeline>),
    Parallel(Vec<Pipeline>),
}

impl Pipeline {
    pub fn series(nodes: impl IntoIterator<Item = Pipeline>) -> Self {
        Pipeline::Series(nodes.into_iter().collect())
    }

    pub fn parallel(nodes: impl IntoIterator<Item = Pipeline>) -> Self {
        Pipeline::Parallel(nodes.into_iter().collect())
    }

    /// clean → copy → images → {styles, html, scripts, sprite, createWebp}
    pub fn build_flow() -> Self {
        use TaskId::*;
        Pipeline::series([
            Pipeline::Task(Clean),
            Pipeline::Task(Copy),
            Pipeline::Task(Images),
            Pipeline::parallel([
                Pipeline::Task(Styles),
                Pipeline::Task(Html),
                Pipeline::Task(Scripts),
                Pipeline::Task(Sprite),
                Pipeline::Task(CreateWebp),
            ]),
        ])
    }

    /// The full build followed by the dev server and the watch loop.
    pub fn default_flow() -> Self {
        Pipeline::series([
            Pipeline::build_flow(),
            Pipeline::series([
                Pipeline::Task(TaskId::Server),
                Pipeline::Task(TaskId::Watcher),
            ]),
        ])
    }

    /// Member tasks in declaration order.
    pub fn tasks(&self) -> Vec<TaskId> {
        let mut out = Vec::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks(&self, out: &mut Vec<TaskId>) {
        match self {
            Pipeline::Task(id) => out.push(*id),
            Pipeline::Series(nodes) | Pipeline::Parallel(nodes) => {
                for node in nodes {
                    node.collect_tasks(out);
                }
            }
        }
    }

    /// Tasks that may start as soon as this node starts.
    pub fn sources(&self) -> Vec<TaskId> {
        match self {
            Pipeline::Task(id) => vec![*id],
            Pipeline::Series(nodes) => nodes.first().map(|n| n.sources()).unwrap_or_default(),
            Pipeline::Parallel(nodes) => nodes.iter().flat_map(|n| n.sources()).collect(),
        }
    }

    /// Tasks whose completion completes this node.
    pub fn sinks(&self) -> Vec<TaskId> {
        match self {
            Pipeline::Task(id) => vec![*id],
            Pipeline::Series(nodes) => nodes.last().map(|n| n.sinks()).unwrap_or_default(),
            Pipeline::Parallel(nodes) => nodes.iter().flat_map(|n| n.sinks()).collect(),
        }
    }

    /// Happens-before edges `(before, after)` implied by series composition.
    ///
    /// For consecutive series steps, every sink of the earlier step precedes
    /// every source of the later one. Parallel members get no edges between
    /// each other.
    pub fn edges(&self) -> Vec<(TaskId, TaskId)> {
        let mut out = Vec::new();
        self.collect_edges(&mut out);
        out
    }

    fn collect_edges(&self, out: &mut Vec<(TaskId, TaskId)>) {
        match self {
            Pipeline::Task(_) => {}
            Pipeline::Series(nodes) => {
                for node in nodes {
                    node.collect_edges(out);
                }
                for pair in nodes.windows(2) {
                    for before in pair[0].sinks() {
                        for after in pair[1].sources() {
                            out.push((before, after));
                        }
                    }
                }
            }
            Pipeline::Parallel(nodes) => {
                for node in nodes {
                    node.collect_edges(out);
                }
            }
        }
    }

    /// Check that the tree is well-formed:
    /// - no empty series/parallel groups
    /// - every task appears at most once
    /// - the induced graph is acyclic
    pub fn validate(&self) -> Result<()> {
        self.ensure_non_empty()?;

        let mut seen = HashSet::new();
        for task in self.tasks() {
            if !seen.insert(task) {
                return Err(SitepipeError::Pipeline(format!(
                    "task '{task}' appears more than once in the pipeline"
                )));
            }
        }

        self.topo_order().map(|_| ())
    }

    fn ensure_non_empty(&self) -> Result<()> {
        match self {
            Pipeline::Task(_) => Ok(()),
            Pipeline::Series(nodes) | Pipeline::Parallel(nodes) => {
                if nodes.is_empty() {
                    return Err(SitepipeError::Pipeline(
                        "series/parallel groups must contain at least one node".to_string(),
                    ));
                }
                nodes.iter().try_for_each(|n| n.ensure_non_empty())
            }
        }
    }

    /// Tasks in an order that respects every happens-before edge.
    pub fn topo_order(&self) -> Result<Vec<TaskId>> {
        let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::new();
        for task in self.tasks() {
            graph.add_node(task);
        }
        for (before, after) in self.edges() {
            graph.add_edge(before, after, ());
        }

        toposort(&graph, None).map_err(|cycle| {
            SitepipeError::Pipeline(format!(
                "cycle detected in pipeline involving task '{}'",
                cycle.node_id()
            ))
        })
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipeline::Task(id) => write!(f, "{id}"),
            Pipeline::Series(nodes) | Pipeline::Parallel(nodes) => {
                let (open, sep, close) = match self {
                    Pipeline::Series(_) => ("series(", " -> ", ")"),
                    _ => ("parallel(", ", ", ")"),
                };
                f.write_str(open)?;
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{node}")?;
                }
                f.write_str(close)
            }
        }
    }
}

/// Externally invocable operation: one task, or one of the named flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Clean,
    Copy,
    Images,
    Styles,
    Html,
    Scripts,
    Sprite,
    #[value(name = "createWebp")]
    CreateWebp,
    Server,
    Watcher,
    Build,
    Default,
}

impl Target {
    /// The pipeline this target runs.
    pub fn pipeline(&self) -> Pipeline {
        let single = |id| Pipeline::Series(vec![Pipeline::Task(id)]);
        match self {
            Target::Clean => single(TaskId::Clean),
            Target::Copy => single(TaskId::Copy),
            Target::Images => single(TaskId::Images),
            Target::Styles => single(TaskId::Styles),
            Target::Html => single(TaskId::Html),
            Target::Scripts => single(TaskId::Scripts),
            Target::Sprite => single(TaskId::Sprite),
            Target::CreateWebp => single(TaskId::CreateWebp),
            Target::Server => single(TaskId::Server),
            Target::Watcher => single(TaskId::Watcher),
            Target::Build => Pipeline::build_flow(),
            Target::Default => Pipeline::default_flow(),
        }
    }

    /// Tasks triggered when this target is invoked.
    pub fn tasks(&self) -> Vec<TaskId> {
        self.pipeline().tasks()
    }

    /// Whether the process should keep running after the initial run.
    pub fn keeps_process_alive(&self) -> bool {
        self.tasks().iter().any(|t| t.keeps_process_alive())
    }
}
