// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::pipeline::Target;

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build a static site's assets and serve them with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// What to run: a single task, `build`, or `default` (build, then serve
    /// and watch).
    #[arg(value_enum, default_value = "default")]
    pub target: Target,

    /// Path to the config file (TOML).
    ///
    /// Default: `Sitepipe.toml` in the current working directory. A missing
    /// file means the built-in configuration.
    #[arg(long, value_name = "PATH", default_value = "Sitepipe.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print the resolved pipeline, but don't
    /// run any task.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
