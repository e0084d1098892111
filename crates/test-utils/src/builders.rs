#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetwatch::config::{ConfigFile, ConfigSection, RawConfigFile, RuleConfig, ServerSection};
use assetwatch::errors::Result;
use assetwatch::fs::FileSystem;
use assetwatch::rules::{ChainTable, TaskRegistry};
use assetwatch::types::{Category, TransformKind};

/// Paths that resolve to each rule of [`ConfigFileBuilder::standard_pipeline`].
pub const SASS_FILE: &str = "src/assets/sass/main.sass";
pub const SASS_PARTIAL: &str = "src/assets/sass/base/_reset.sass";
pub const SCRIPT_FILE: &str = "src/assets/js/app.js";
pub const FONT_FILE: &str = "src/assets/fonts/inter.woff2";
pub const IMAGE_FILE: &str = "src/assets/images/logo.png";
pub const SVG_FILE: &str = "src/assets/svg/icon.svg";
pub const HTML_FILE: &str = "src/index.html";
pub const HTML_PARTIAL: &str = "src/partials/header.html";

/// Task ids of the standard pipeline, in canonical order.
pub const STANDARD_TASKS: [&str; 6] = ["styles", "scripts", "fonts", "images", "svg", "html"];

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                server: ServerSection::default(),
                rule: BTreeMap::new(),
                chain: BTreeMap::new(),
            },
        }
    }

    /// Six rules laid out like a typical front-end project.
    ///
    /// Command rules run `true`, so they succeed without doing anything.
    pub fn standard_pipeline() -> Self {
        Self::new()
            .with_rule(
                "styles",
                RuleConfigBuilder::new(Category::Style, "src/assets/sass/*.sass")
                    .watch("src/assets/sass/**/*.sass")
                    .dest("build/assets/css")
                    .cmd("true")
                    .build(),
            )
            .with_rule(
                "scripts",
                RuleConfigBuilder::new(Category::Script, "src/assets/js/**/*.js")
                    .dest("build/assets/js")
                    .cmd("true")
                    .build(),
            )
            .with_rule(
                "fonts",
                RuleConfigBuilder::new(Category::Font, "src/assets/fonts/**/*")
                    .dest("build/assets/fonts")
                    .build(),
            )
            .with_rule(
                "images",
                RuleConfigBuilder::new(Category::Image, "src/assets/images/**/*.{jpg,jpeg,png,gif}")
                    .dest("build/assets/images")
                    .build(),
            )
            .with_rule(
                "svg",
                RuleConfigBuilder::new(Category::Svg, "src/assets/svg/**/*.svg")
                    .dest("build/assets/svg")
                    .build(),
            )
            .with_rule(
                "html",
                RuleConfigBuilder::new(Category::Html, "src/*.html")
                    .watch("src/**/*.html")
                    .dest("build")
                    .build(),
            )
    }

    pub fn with_rule(mut self, name: &str, rule: RuleConfig) -> Self {
        self.config.rule.insert(name.to_string(), rule);
        self
    }

    pub fn without_rule(mut self, name: &str) -> Self {
        self.config.rule.remove(name);
        self
    }

    pub fn with_chain(mut self, category: Category, tasks: &[&str]) -> Self {
        self.config
            .chain
            .insert(category, tasks.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.config.root = Some(root.into());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RuleConfig`.
pub struct RuleConfigBuilder {
    rule: RuleConfig,
}

impl RuleConfigBuilder {
    pub fn new(category: Category, src: &str) -> Self {
        Self {
            rule: RuleConfig {
                category,
                src: vec![src.to_string()],
                watch: None,
                exclude: Vec::new(),
                dest: PathBuf::from("build"),
                transform: None,
                cmd: None,
                include_prefix: None,
            },
        }
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.rule.src.push(pattern.to_string());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.rule.watch.get_or_insert_with(Vec::new).push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.rule.exclude.push(pattern.to_string());
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.rule.dest = PathBuf::from(dest);
        self
    }

    pub fn transform(mut self, kind: TransformKind) -> Self {
        self.rule.transform = Some(kind);
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.rule.cmd = Some(cmd.to_string());
        self
    }

    pub fn include_prefix(mut self, prefix: &str) -> Self {
        self.rule.include_prefix = Some(prefix.to_string());
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}

/// Build a validated registry and its chain table for `cfg`, rooted at `root`.
pub fn registry_for(
    cfg: &ConfigFile,
    fs: &dyn FileSystem,
    root: &Path,
) -> Result<(Arc<TaskRegistry>, ChainTable)> {
    let registry = TaskRegistry::from_config(cfg, fs, root)?;
    let chains = ChainTable::with_overrides(&registry, cfg.chain_overrides())?;
    Ok((Arc::new(registry), chains))
}

/// The standard pipeline over an empty in-memory project rooted at `.`.
pub fn standard_registry() -> (Arc<TaskRegistry>, ChainTable) {
    let fs = assetwatch::fs::mock::MockFileSystem::new();
    let cfg = ConfigFileBuilder::standard_pipeline().build();
    registry_for(&cfg, &fs, Path::new(".")).expect("standard pipeline is valid")
}
