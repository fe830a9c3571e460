// src/types.rs

use serde::Deserialize;

/// What happens to a source change that arrives while a build run is still
/// in progress.
///
/// - `Queue` (default): coalesce it into a pending batch that runs once the
///   current run finishes.
/// - `Cancel`: forget older pending batches and keep only the newest one.
///
/// Either way, tasks that already started are left to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}
