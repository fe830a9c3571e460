// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{RunSummary, ScheduledTask};
use crate::errors::{Result, SitepipeError};
use crate::exec::ExecutorBackend;
use crate::pipeline::TaskId;
use crate::server::DevServer;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// What happened while the runtime was alive.
#[derive(Debug, Clone, Default)]
pub struct RuntimeReport {
    /// Summaries of every finished run, in order.
    pub runs: Vec<RunSummary>,
    /// Number of browser reloads requested.
    pub reloads: usize,
}

impl RuntimeReport {
    /// Tasks that failed in any run (may contain repeats across runs).
    pub fn failed_tasks(&self) -> Vec<TaskId> {
        self.runs.iter().flat_map(|r| r.failed.iter().copied()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.runs.iter().all(RunSummary::is_success)
    }
}

/// Drives the DAG scheduler in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    server: Option<Arc<DevServer>>,
    report: RuntimeReport,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            server: None,
            report: RuntimeReport::default(),
        }
    }

    /// Reload browsers connected to `server` after runs that ask for it.
    pub fn with_server(mut self, server: Arc<DevServer>) -> Self {
        self.server = Some(server);
        self
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core.
    pub async fn run(mut self) -> Result<RuntimeReport> {
        info!("sitepipe runtime started");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!(runs = self.report.runs.len(), "runtime exiting");
        Ok(self.report)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
            CoreCommand::RunFinished { summary, reload } => {
                if !summary.failed.is_empty() {
                    warn!(run_id = summary.run_id, failed = ?summary.failed, "run finished with failures");
                } else {
                    info!(run_id = summary.run_id, tasks = summary.succeeded.len(), "run finished");
                }
                if reload {
                    self.report.reloads += 1;
                    if let Some(server) = &self.server {
                        server.reload();
                    }
                }
                self.report.runs.push(summary);
            }
            CoreCommand::Abort { task } => {
                return Err(SitepipeError::Aborted(task));
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.task.as_str()).collect();
        let run_ids: Vec<_> = tasks.iter().map(|t| t.run_id).collect();
        debug!(?names, ?run_ids, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
