// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetwatchError, Result};
use crate::types::{Category, TransformKind};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.server,
            raw.rule,
            raw.chain,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_rules(cfg)?;
    validate_categories(cfg)?;
    validate_rules(cfg)?;
    validate_chains(cfg)?;
    Ok(())
}

fn ensure_has_rules(cfg: &RawConfigFile) -> Result<()> {
    if cfg.rule.is_empty() {
        return Err(AssetwatchError::ConfigError(
            "config must contain at least one [rule.<name>] section".to_string(),
        ));
    }
    Ok(())
}

/// One rule per category.
fn validate_categories(cfg: &RawConfigFile) -> Result<()> {
    let mut owners: BTreeMap<Category, &str> = BTreeMap::new();
    for (name, rule) in cfg.rule.iter() {
        if let Some(previous) = owners.insert(rule.category, name.as_str()) {
            return Err(AssetwatchError::ConfigError(format!(
                "rules '{}' and '{}' both declare category '{}'",
                previous, name, rule.category
            )));
        }
    }
    Ok(())
}

fn validate_rules(cfg: &RawConfigFile) -> Result<()> {
    for (name, rule) in cfg.rule.iter() {
        if rule.src.is_empty() {
            return Err(AssetwatchError::ConfigError(format!(
                "rule '{}' must list at least one `src` glob",
                name
            )));
        }

        if rule.effective_transform() == TransformKind::Command {
            let has_cmd = rule.cmd.as_deref().is_some_and(|c| !c.trim().is_empty());
            if !has_cmd {
                return Err(AssetwatchError::ConfigError(format!(
                    "rule '{}' uses the command transform but has no `cmd`",
                    name
                )));
            }
        }

        if let Some(prefix) = &rule.include_prefix {
            if prefix.is_empty() {
                return Err(AssetwatchError::ConfigError(format!(
                    "rule '{}' has an empty `include_prefix`",
                    name
                )));
            }
        }

        let patterns = rule
            .src
            .iter()
            .chain(rule.effective_watch())
            .chain(rule.exclude.iter());
        for pattern in patterns {
            if let Err(err) = Glob::new(pattern) {
                return Err(AssetwatchError::ConfigError(format!(
                    "rule '{}' has invalid glob '{}': {}",
                    name, pattern, err
                )));
            }
        }
    }
    Ok(())
}

fn validate_chains(cfg: &RawConfigFile) -> Result<()> {
    for (category, chain) in cfg.chain.iter() {
        if chain.is_empty() {
            return Err(AssetwatchError::ConfigError(format!(
                "[chain].{} must name at least one rule",
                category
            )));
        }

        let mut seen = HashSet::new();
        for entry in chain {
            if !cfg.rule.contains_key(entry) {
                return Err(AssetwatchError::ConfigError(format!(
                    "[chain].{} references unknown rule '{}'",
                    category, entry
                )));
            }
            if !seen.insert(entry.as_str()) {
                return Err(AssetwatchError::ConfigError(format!(
                    "[chain].{} lists rule '{}' more than once",
                    category, entry
                )));
            }
        }
    }
    Ok(())
}
