// src/config/mod.rs

//! Configuration loading and validation for assetwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate structural invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, project_root};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, RuleConfig, ServerSection};
