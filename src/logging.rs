// src/logging.rs

//! Logging setup for `sitepipe` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `SITEPIPE_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout stays free for `--dry-run`
//! output.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("SITEPIPE_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::INFO),
    };

    let filter = EnvFilter::try_new(filter_directives(level))
        .context("building log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// `sitepipe` logs at `level`; dependencies stay at `warn` unless we are
/// debugging.
fn filter_directives(level: Level) -> String {
    let deps = if level >= Level::DEBUG { level } else { level.min(Level::WARN) };
    format!("{},sitepipe={}", deps.as_str().to_lowercase(), level.as_str().to_lowercase())
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_are_capped_at_warn() {
        assert_eq!(filter_directives(Level::INFO), "warn,sitepipe=info");
        assert_eq!(filter_directives(Level::ERROR), "error,sitepipe=error");
    }

    #[test]
    fn debugging_opens_up_dependencies() {
        assert_eq!(filter_directives(Level::DEBUG), "debug,sitepipe=debug");
    }

    #[test]
    fn env_values_are_case_insensitive() {
        assert_eq!(parse_level_str(" Warning "), Some(Level::WARN));
        assert_eq!(parse_level_str("verbose"), None);
    }
}
