// src/watch/event_handler.rs

//! Turning changed paths into triggers.

use std::path::Path;

use notify::EventKind;
use tracing::{debug, warn};

use crate::engine::Trigger;
use crate::fs::FileSystem;
use crate::watch::cache::ContentFilter;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBinding;

/// Whether a notify event kind can change what a task would produce.
pub fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

/// Compute the trigger for a single changed path.
///
/// 1. Relativise the path against `root`.
/// 2. Collect every binding whose patterns match (exclusion wins).
/// 3. With a content filter, drop events whose file content did not change.
/// 4. Union the bound tasks; reload if any matching binding asks for it.
pub fn trigger_for_path(
    fs: &dyn FileSystem,
    root: &Path,
    path: &Path,
    bindings: &[WatchBinding],
    filter: Option<&mut ContentFilter>,
) -> Option<Trigger> {
    let Some(rel) = relative_str(root, path) else {
        warn!(?path, ?root, "could not relativize path against root");
        return None;
    };

    let matching: Vec<&WatchBinding> = bindings.iter().filter(|b| b.matches(&rel)).collect();
    if matching.is_empty() {
        return None;
    }

    if let Some(filter) = filter {
        if !filter.has_changed(fs, path) {
            return None;
        }
    }

    let mut tasks = Vec::new();
    let mut reload = false;
    for binding in matching {
        for &task in binding.tasks() {
            if !tasks.contains(&task) {
                tasks.push(task);
            }
        }
        reload |= binding.reload();
    }

    debug!(rel = %rel, ?tasks, reload, "watch match -> triggering tasks");
    Some(Trigger::file_watch(tasks, reload))
}

/// Merge triggers produced by the paths of one notify event.
pub fn merge_triggers(triggers: impl IntoIterator<Item = Trigger>) -> Option<Trigger> {
    triggers.into_iter().reduce(|mut acc, t| {
        for task in t.tasks {
            if !acc.tasks.contains(&task) {
                acc.tasks.push(task);
            }
        }
        acc.reload |= t.reload;
        acc
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{AccessKind, CreateKind};

    use super::*;
    use crate::config::model::default_watch_bindings;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::TaskId;
    use crate::watch::patterns::build_bindings;

    fn setup() -> (MockFileSystem, Vec<WatchBinding>) {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/docs/index.html", "<p>");
        fs.add_file("/proj/docs/sass/style.scss", "a{}");
        (fs, build_bindings(&default_watch_bindings()).unwrap())
    }

    #[test]
    fn html_change_requests_reload() {
        let (fs, bindings) = setup();
        let trigger = trigger_for_path(
            &fs,
            Path::new("/proj"),
            &PathBuf::from("/proj/docs/index.html"),
            &bindings,
            None,
        )
        .unwrap();
        assert_eq!(trigger.tasks, vec![TaskId::Html]);
        assert!(trigger.reload);
    }

    #[test]
    fn unrelated_path_does_nothing() {
        let (fs, bindings) = setup();
        assert!(
            trigger_for_path(
                &fs,
                Path::new("/proj"),
                Path::new("/proj/README.md"),
                &bindings,
                None
            )
            .is_none()
        );
    }

    #[test]
    fn unchanged_content_is_skipped_with_filter() {
        let (fs, bindings) = setup();
        let path = Path::new("/proj/docs/sass/style.scss");
        let mut filter = ContentFilter::new();
        filter.prime(&fs, path);

        assert!(trigger_for_path(&fs, Path::new("/proj"), path, &bindings, Some(&mut filter)).is_none());
        fs.add_file(path, "b{}");
        let trigger =
            trigger_for_path(&fs, Path::new("/proj"), path, &bindings, Some(&mut filter)).unwrap();
        assert_eq!(trigger.tasks, vec![TaskId::Styles]);
        assert!(!trigger.reload);
    }

    #[test]
    fn merged_event_unions_tasks_and_reload() {
        let merged = merge_triggers([
            Trigger::file_watch(vec![TaskId::Styles], false),
            Trigger::file_watch(vec![TaskId::Html, TaskId::Styles], true),
        ])
        .unwrap();
        assert_eq!(merged.tasks, vec![TaskId::Styles, TaskId::Html]);
        assert!(merged.reload);
    }

    #[test]
    fn access_events_are_ignored() {
        assert!(!is_relevant(&EventKind::Access(AccessKind::Any)));
        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
    }
}
