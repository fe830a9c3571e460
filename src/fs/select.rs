// src/fs/select.rs

//! Glob-based selection of task input files.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;

/// Build a GlobSet from simple string patterns.
///
/// `*` and `?` never match `/`, so `*.html` only selects files directly in
/// the base directory while `img/**/*.svg` descends.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// A file picked by a [`FileSelection`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SelectedFile {
    /// Path relative to the selection base, with forward slashes.
    pub rel: String,
    /// Full path (base joined with `rel`).
    pub path: PathBuf,
}

/// Include/exclude glob sets evaluated relative to a base directory.
///
/// Exclusion always wins: a path matching both sets is not selected.
#[derive(Clone)]
pub struct FileSelection {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for FileSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSelection")
            .field("include", &self.include.len())
            .field("exclude", &self.exclude.as_ref().map(|e| e.len()))
            .finish()
    }
}

impl FileSelection {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = build_globset(include).context("building include globset")?;
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };
        Ok(Self { include, exclude })
    }

    pub fn include(patterns: &[String]) -> Result<Self> {
        Self::new(patterns, &[])
    }

    /// Whether `rel_path` (relative, forward slashes) is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Walk `base` and return every selected file, sorted by relative path.
    ///
    /// A missing base directory selects nothing.
    pub fn collect(&self, fs: &dyn FileSystem, base: &Path) -> Result<Vec<SelectedFile>> {
        let mut files = Vec::new();
        if !fs.is_dir(base) {
            return Ok(files);
        }

        let mut stack = vec![base.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(base) {
                        let rel = rel.to_string_lossy().replace('\\', "/");
                        if self.matches(&rel) {
                            files.push(SelectedFile { rel, path });
                        }
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
