// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run structural validation.
///
/// Checks that need the filesystem (glob overlap between rules, writable
/// destinations) happen later, when the task registry is built.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the project root for a config file.
///
/// - An explicit `[config].root` wins; relative values are resolved against
///   the config file's directory.
/// - Otherwise the config file's directory is used, falling back to the
///   current working directory for a bare filename.
pub fn project_root(config_path: &Path, cfg: &ConfigFile) -> PathBuf {
    let config_dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    match &cfg.config_section().root {
        Some(root) if root.is_absolute() => root.clone(),
        Some(root) => config_dir.join(root),
        None => config_dir,
    }
}
