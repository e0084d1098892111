// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetwatch",
    version,
    about = "Build front-end assets, serve them, and rebuild on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Assetwatch.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Assetwatch.toml")]
    pub config: String,

    /// Run the full build once and exit. No server, no watching.
    #[arg(long)]
    pub once: bool,

    /// Watch and rebuild without starting the preview server.
    #[arg(long)]
    pub no_serve: bool,

    /// Override `[server].port`.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print rules and chains, but don't build anything.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_watch_mode_with_server() {
        let args = CliArgs::parse_from(["assetwatch"]);
        assert_eq!(args.config, "Assetwatch.toml");
        assert!(!args.once);
        assert!(!args.no_serve);
        assert!(args.port.is_none());
    }

    #[test]
    fn parses_overrides() {
        let args = CliArgs::parse_from([
            "assetwatch",
            "--config",
            "site/Assetwatch.toml",
            "--once",
            "--port",
            "8080",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.config, "site/Assetwatch.toml");
        assert!(args.once);
        assert_eq!(args.port, Some(8080));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
