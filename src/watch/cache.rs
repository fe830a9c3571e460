// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Remembers the last seen content hash of every watched file so that
/// events which did not change content (editor touch, attribute change)
/// can be ignored.
#[derive(Debug, Default)]
pub struct ContentFilter {
    hashes: HashMap<PathBuf, String>,
}

impl ContentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current hash of `path` without reporting a change.
    pub fn prime(&mut self, fs: &dyn FileSystem, path: &Path) {
        match compute_file_hash(fs, path) {
            Ok(hash) => {
                self.hashes.insert(path.to_path_buf(), hash);
            }
            Err(e) => debug!(?path, error = %e, "could not prime hash"),
        }
    }

    /// Whether the content of `path` differs from the last time it was seen.
    ///
    /// Deleted (or unreadable) files always count as changed.
    pub fn has_changed(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        if !fs.is_file(path) {
            self.hashes.remove(path);
            debug!(?path, "file is gone; treating as changed");
            return true;
        }

        let hash = match compute_file_hash(fs, path) {
            Ok(h) => h,
            Err(e) => {
                warn!(?path, error = %e, "failed to hash file; treating as changed");
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(previous) if previous == hash => {
                debug!(?path, "content unchanged; ignoring event");
                false
            }
            _ => true,
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn unchanged_content_is_filtered() {
        let fs = MockFileSystem::new();
        fs.add_file("docs/a.scss", "a{}");
        let mut filter = ContentFilter::new();
        filter.prime(&fs, Path::new("docs/a.scss"));

        assert!(!filter.has_changed(&fs, Path::new("docs/a.scss")));
        fs.add_file("docs/a.scss", "b{}");
        assert!(filter.has_changed(&fs, Path::new("docs/a.scss")));
        assert!(!filter.has_changed(&fs, Path::new("docs/a.scss")));
    }

    #[test]
    fn unseen_file_counts_as_changed() {
        let fs = MockFileSystem::new();
        fs.add_file("docs/new.html", "<p>");
        let mut filter = ContentFilter::new();
        assert!(filter.has_changed(&fs, Path::new("docs/new.html")));
    }

    #[test]
    fn deleted_file_always_triggers() {
        let fs = MockFileSystem::new();
        fs.add_file("docs/a.scss", "a{}");
        let mut filter = ContentFilter::new();
        filter.prime(&fs, Path::new("docs/a.scss"));
        assert!(filter.has_changed(&fs, Path::new("docs/gone.scss")));
        assert_eq!(filter.len(), 1);
    }
}
