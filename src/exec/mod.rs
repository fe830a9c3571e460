// src/exec/mod.rs

//! Task execution layer.
//!
//! The runtime hands scheduled tasks to an [`ExecutorBackend`]; the real
//! backend runs each one through [`crate::tasks::run_task`] on its own tokio
//! task and reports back with `RuntimeEvent::TaskCompleted`.
//!
//! - [`executor_loop`] receives scheduled tasks and spawns runners.
//! - [`task_runner`] runs one task and maps its result to an outcome.
//! - [`backend`] provides the `ExecutorBackend` trait, so tests can swap in
//!   a fake executor.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
