// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Startup error: {0}")]
    StartupError(String),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single task's transform.
///
/// These never terminate a development session; the scheduler logs them and
/// aborts only the chain that was running.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("command for task '{task}' exited with code {code}{}", stderr_suffix(.stderr_tail))]
    CommandFailed {
        task: String,
        code: i32,
        stderr_tail: Vec<String>,
    },

    #[error("include cycle detected at {0:?}")]
    IncludeCycle(PathBuf),

    #[error("includes nested deeper than {max} levels at {file:?}")]
    IncludeTooDeep { file: PathBuf, max: usize },

    #[error("invalid include parameters in {file:?}: {reason}")]
    IncludeParams { file: PathBuf, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn stderr_suffix(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!(":\n{}", lines.join("\n"))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetwatchError>;
