// src/config/mod.rs

//! Configuration loading and validation for sitepipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to built-in defaults (`loader.rs`).
//! - Validate paths, qualities, globs and watch bindings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_builtin};
pub use model::{
    ConfigFile, ConfigSection, CopySection, HtmlSection, ImagesSection, PathsSection,
    RawConfigFile, ScriptsSection, ServerSection, SpriteSection, StylesSection,
    WatchBindingConfig, default_watch_bindings,
};
