// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SitepipeError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_paths(cfg)?;
    validate_images(cfg)?;
    validate_globs(cfg)?;
    validate_watch_bindings(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(SitepipeError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let source = &cfg.paths.source;
    let build = &cfg.paths.build;

    if is_blank(source) || is_blank(build) {
        return Err(SitepipeError::ConfigError(
            "[paths].source and [paths].build must not be empty".to_string(),
        ));
    }

    // `clean` deletes the build directory, so it must never contain the sources.
    if normalize(source).starts_with(normalize(build)) {
        return Err(SitepipeError::ConfigError(format!(
            "[paths].build ({}) must not contain [paths].source ({})",
            build.display(),
            source.display()
        )));
    }

    for (key, path) in [
        ("styles.entry", &cfg.styles.entry),
        ("styles.output", &cfg.styles.output),
        ("scripts.entry", &cfg.scripts.entry),
        ("scripts.output", &cfg.scripts.output),
        ("sprite.output", &cfg.sprite.output),
    ] {
        if is_blank(path) || path.is_absolute() {
            return Err(SitepipeError::ConfigError(format!(
                "[{key}] must be a non-empty relative path (got {:?})",
                path
            )));
        }
    }

    Ok(())
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// Lexically drop `.` and fold `..` so equivalent spellings compare equal.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn validate_images(cfg: &RawConfigFile) -> Result<()> {
    for (key, quality) in [
        ("webp_quality", cfg.images.webp_quality),
        ("jpeg_quality", cfg.images.jpeg_quality),
    ] {
        if quality > 100 {
            return Err(SitepipeError::ConfigError(format!(
                "[images].{key} must be within 0..=100 (got {quality})"
            )));
        }
    }

    if cfg.images.png_level > 6 {
        return Err(SitepipeError::ConfigError(format!(
            "[images].png_level must be within 0..=6 (got {})",
            cfg.images.png_level
        )));
    }

    Ok(())
}

fn validate_globs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.copy.include.is_empty() {
        return Err(SitepipeError::ConfigError(
            "[copy].include must contain at least one pattern".to_string(),
        ));
    }

    let lists: [(&str, &[String]); 6] = [
        ("html.include", &cfg.html.include),
        ("images.include", &cfg.images.include),
        ("images.webp_include", &cfg.images.webp_include),
        ("copy.include", &cfg.copy.include),
        ("copy.exclude", &cfg.copy.exclude),
        ("sprite.icons", std::slice::from_ref(&cfg.sprite.icons)),
    ];

    for (key, patterns) in lists {
        for pattern in patterns {
            check_glob(key, pattern)?;
        }
    }

    Ok(())
}

fn check_glob(key: &str, pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(SitepipeError::ConfigError(format!(
            "[{key}] contains an empty pattern"
        )));
    }
    Glob::new(pattern).map_err(|source| SitepipeError::Glob {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(())
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    for (idx, binding) in cfg.watch.iter().enumerate() {
        if binding.patterns.is_empty() {
            return Err(SitepipeError::ConfigError(format!(
                "[[watch]] #{idx} must list at least one pattern"
            )));
        }
        if binding.tasks.is_empty() {
            return Err(SitepipeError::ConfigError(format!(
                "[[watch]] #{idx} must list at least one task"
            )));
        }
        if let Some(task) = binding.tasks.iter().find(|t| !t.is_transform()) {
            return Err(SitepipeError::ConfigError(format!(
                "[[watch]] #{idx} cannot re-run '{task}'; only asset tasks can be bound"
            )));
        }
        for pattern in binding.patterns.iter().chain(binding.exclude.iter()) {
            check_glob("watch", pattern)?;
        }
    }
    Ok(())
}
