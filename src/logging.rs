// src/logging.rs

//! Logging setup for `assetwatch` using `tracing` + `tracing-subscriber`.
//!
//! The filter is chosen in this order:
//! 1. `--log-level` (applies to assetwatch; the HTTP stack stays at `warn`)
//! 2. `ASSETWATCH_LOG`, either a bare level or full `EnvFilter` directives
//!    such as `assetwatch=debug,tower_http=debug`
//! 3. `info` for assetwatch, `warn` for everything else
//!
//! Logs go to STDERR. Build tool output is forwarded through the logger as
//! well, so stdout only carries `--dry-run` output.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ASSETWATCH_LOG";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directives = match cli_level {
        Some(level) => default_directives(level_name(level)),
        None => match std::env::var(LOG_ENV) {
            Ok(value) => env_directives(&value),
            Err(_) => default_directives("info"),
        },
    };

    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter '{directives}'"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    Ok(())
}

fn default_directives(level: &str) -> String {
    format!("warn,assetwatch={level}")
}

/// A bare level scopes to assetwatch; anything else is passed through.
fn env_directives(value: &str) -> String {
    let value = value.trim();
    match parse_level_name(value) {
        Some(level) => default_directives(level),
        None if value.is_empty() => default_directives("info"),
        None => value.to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn parse_level_name(s: &str) -> Option<&'static str> {
    match s.to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_levels_scope_to_assetwatch() {
        assert_eq!(env_directives(" Debug "), "warn,assetwatch=debug");
        assert_eq!(env_directives("warning"), "warn,assetwatch=warn");
        assert_eq!(env_directives(""), "warn,assetwatch=info");
    }

    #[test]
    fn full_directives_pass_through() {
        assert_eq!(
            env_directives("assetwatch=trace,tower_http=debug"),
            "assetwatch=trace,tower_http=debug"
        );
    }

    #[test]
    fn cli_level_wins_over_defaults() {
        assert_eq!(default_directives(level_name(LogLevel::Trace)), "warn,assetwatch=trace");
    }
}
