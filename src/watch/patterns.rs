// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};

use crate::config::model::WatchBindingConfig;
use crate::fs::FileSelection;
use crate::pipeline::TaskId;

/// A compiled `[[watch]]` binding.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"docs/sass/base.scss"`) into [`WatchBinding::matches`].
#[derive(Clone)]
pub struct WatchBinding {
    tasks: Vec<TaskId>,
    reload: bool,
    selection: FileSelection,
    patterns: Vec<String>,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("patterns", &self.patterns)
            .field("tasks", &self.tasks)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn reload(&self) -> bool {
        self.reload
    }

    /// Whether a root-relative path belongs to this binding. Exclusion wins.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.selection.matches(rel_path)
    }
}

/// Compile every binding from the config.
pub fn build_bindings(configs: &[WatchBindingConfig]) -> Result<Vec<WatchBinding>> {
    configs
        .iter()
        .map(|cfg| {
            let selection = FileSelection::new(&cfg.patterns, &cfg.exclude)
                .with_context(|| format!("building watch binding for {:?}", cfg.tasks))?;
            Ok(WatchBinding {
                tasks: cfg.tasks.clone(),
                reload: cfg.reload,
                selection,
                patterns: cfg.patterns.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::default_watch_bindings;

    #[test]
    fn default_bindings_route_sources_to_tasks() {
        let bindings = build_bindings(&default_watch_bindings()).unwrap();
        let hits = |rel: &str| -> Vec<TaskId> {
            bindings
                .iter()
                .filter(|b| b.matches(rel))
                .flat_map(|b| b.tasks().iter().copied())
                .collect()
        };

        assert_eq!(hits("docs/sass/blocks/header.scss"), vec![TaskId::Styles]);
        assert_eq!(hits("docs/js/script.js"), vec![TaskId::Scripts]);
        assert_eq!(hits("docs/index.html"), vec![TaskId::Html]);
        assert!(hits("docs/js/other.js").is_empty());
        assert!(hits("build/index.html").is_empty());
    }

    #[test]
    fn exclude_beats_pattern() {
        let bindings = build_bindings(&[WatchBindingConfig {
            patterns: vec!["docs/**/*.scss".into()],
            exclude: vec!["docs/vendor/**".into()],
            tasks: vec![TaskId::Styles],
            reload: false,
        }])
        .unwrap();
        assert!(bindings[0].matches("docs/a.scss"));
        assert!(!bindings[0].matches("docs/vendor/b.scss"));
    }
}
