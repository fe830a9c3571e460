// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` bindings (globs → tasks) from the config.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optionally skipping events whose file content did not change.
//!
//! It does **not** know about the DAG; it only turns filesystem changes into
//! [`Trigger`](crate::engine::Trigger)s for the runtime.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use cache::ContentFilter;
pub use event_handler::trigger_for_path;
pub use patterns::{WatchBinding, build_bindings};
pub use watcher::{WatchSettings, WatcherHandle, spawn_watcher};
