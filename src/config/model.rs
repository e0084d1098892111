// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{Category, TransformKind};

/// Raw top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// debounce_ms = 0
///
/// [server]
/// port = 3000
///
/// [rule.styles]
/// category = "style"
/// src = ["src/assets/sass/*.sass"]
/// dest = "build/assets/css"
/// cmd = "sass src/assets/sass/main.sass build/assets/css/main.min.css"
///
/// [chain]
/// html = ["styles", "html"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub server: ServerSection,

    /// Rules keyed by task id (e.g. `"styles"`, `"images"`).
    #[serde(default)]
    pub rule: BTreeMap<String, RuleConfig>,

    /// Optional chain overrides keyed by the category of the changed file.
    #[serde(default)]
    pub chain: BTreeMap<Category, Vec<String>>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (see
/// `validate.rs`), so holders can rely on the structural invariants.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    server: ServerSection,
    rules: BTreeMap<String, RuleConfig>,
    chains: BTreeMap<Category, Vec<String>>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        server: ServerSection,
        rules: BTreeMap<String, RuleConfig>,
        chains: BTreeMap<Category, Vec<String>>,
    ) -> Self {
        Self {
            config,
            server,
            rules,
            chains,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn server_section(&self) -> &ServerSection {
        &self.server
    }

    pub fn rules(&self) -> &BTreeMap<String, RuleConfig> {
        &self.rules
    }

    pub fn chain_overrides(&self) -> &BTreeMap<Category, Vec<String>> {
        &self.chains
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Project root that globs and `dest` paths are relative to.
    ///
    /// If `None`, the directory containing the config file is used.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Window for collapsing filesystem events before they reach the
    /// scheduler. `0` forwards every event immediately.
    #[serde(default)]
    pub debounce_ms: u64,

    /// Whether to build everything once before watching.
    #[serde(default = "default_true")]
    pub initial_build: bool,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            root: None,
            debounce_ms: 0,
            initial_build: true,
        }
    }
}

/// `[server]` section: the live-preview server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory served to the browser, relative to the project root.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_dir: default_base_dir(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[rule.<id>]` section: one path rule and the task that builds it.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub category: Category,

    /// Source globs handed to the transform.
    pub src: Vec<String>,

    /// Globs this rule owns for change detection.
    ///
    /// If `None`, the `src` globs are watched.
    #[serde(default)]
    pub watch: Option<Vec<String>>,

    /// Globs removed from both the source and watch sets.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Output directory, relative to the project root.
    pub dest: PathBuf,

    /// Transform override; defaults by category.
    #[serde(default)]
    pub transform: Option<TransformKind>,

    /// Shell command for `transform = "command"`.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Directive prefix for `transform = "include"` (default `@@`).
    #[serde(default)]
    pub include_prefix: Option<String>,
}

impl RuleConfig {
    pub fn effective_transform(&self) -> TransformKind {
        self.transform
            .unwrap_or_else(|| self.category.default_transform())
    }

    pub fn effective_watch(&self) -> &[String] {
        match &self.watch {
            Some(list) => list,
            None => &self.src,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}
