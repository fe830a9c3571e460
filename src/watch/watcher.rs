// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::{FileSelection, FileSystem};
use crate::watch::cache::ContentFilter;
use crate::watch::event_handler::{is_relevant, merge_triggers, trigger_for_path};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBinding;

/// What to watch and how.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Project root; binding patterns are relative to it.
    pub root: PathBuf,
    /// Directory observed recursively (the source tree).
    pub watch_dir: PathBuf,
    pub bindings: Vec<WatchBinding>,
    /// Skip events whose file content hash did not change.
    pub use_hash: bool,
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle (or
/// calling [`WatcherHandle::stop`]) stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn stop(self) {
        self.task.abort();
        debug!("file watcher stopped");
    }
}

/// Spawn a filesystem watcher that observes `settings.watch_dir`
/// recursively and sends `RuntimeEvent::Triggered` for bindings whose
/// patterns match a changed path.
pub fn spawn_watcher(
    settings: WatchSettings,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = fs
        .canonicalize(&settings.root)
        .unwrap_or_else(|_| settings.root.clone());
    let watch_dir = fs
        .canonicalize(&settings.watch_dir)
        .unwrap_or_else(|_| settings.watch_dir.clone());

    let mut filter = settings.use_hash.then(ContentFilter::new);
    if let Some(filter) = filter.as_mut() {
        prime_filter(filter, fs.as_ref(), &root, &watch_dir, &settings.bindings);
        debug!(files = filter.len(), "primed content hashes");
    }

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("sitepipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("sitepipe: file watch error: {err}"),
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&watch_dir, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", watch_dir))?;

    info!(dir = ?watch_dir, bindings = settings.bindings.len(), "file watcher started");

    let bindings = settings.bindings;
    let task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !is_relevant(&event.kind) {
                continue;
            }
            debug!(?event, "received notify event");

            let triggers: Vec<_> = event
                .paths
                .iter()
                .filter_map(|path| {
                    trigger_for_path(fs.as_ref(), &root, path, &bindings, filter.as_mut())
                })
                .collect();

            let Some(trigger) = merge_triggers(triggers) else {
                continue;
            };

            if let Err(err) = runtime_tx.send(RuntimeEvent::Triggered(trigger)).await {
                warn!("failed to send RuntimeEvent::Triggered: {err}");
                // Runtime is gone; nothing left to notify.
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
    })
}

/// Hash every file currently matched by a binding.
fn prime_filter(
    filter: &mut ContentFilter,
    fs: &dyn FileSystem,
    root: &Path,
    watch_dir: &Path,
    bindings: &[WatchBinding],
) {
    let everything = match FileSelection::include(&["**".to_string()]) {
        Ok(sel) => sel,
        Err(e) => {
            warn!(error = %e, "could not build priming selection");
            return;
        }
    };
    let files = match everything.collect(fs, watch_dir) {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, "could not list watched files");
            return;
        }
    };

    for file in files {
        let Some(rel) = relative_str(root, &file.path) else {
            continue;
        };
        if bindings.iter().any(|b| b.matches(&rel)) {
            filter.prime(fs, &file.path);
        }
    }
}
