// src/rules/chain.rs

//! Declarative trigger chains.
//!
//! A chain is the ordered list of tasks a change in one category runs. By
//! default every category runs only its own task, except HTML, which
//! escalates to every registered task in canonical order (HTML assembly may
//! reference any other asset). `[chain]` in the config overrides a
//! category's chain.

use std::collections::{BTreeMap, HashMap};

use crate::engine::TaskName;
use crate::errors::{AssetwatchError, Result};
use crate::rules::registry::{Task, TaskRegistry};
use crate::types::Category;

#[derive(Debug, Clone, Default)]
pub struct ChainTable {
    chains: HashMap<Category, Vec<TaskName>>,
}

impl ChainTable {
    /// Default chains for the tasks in `registry`.
    pub fn defaults(registry: &TaskRegistry) -> Self {
        let mut chains = HashMap::new();
        for task in registry.all() {
            let category = task.rule().category();
            let chain = if category == Category::Html {
                registry.ids().map(str::to_string).collect()
            } else {
                vec![task.id().to_string()]
            };
            chains.insert(category, chain);
        }
        Self { chains }
    }

    /// Defaults with per-category overrides applied.
    pub fn with_overrides(
        registry: &TaskRegistry,
        overrides: &BTreeMap<Category, Vec<String>>,
    ) -> Result<Self> {
        let mut table = Self::defaults(registry);
        for (category, chain) in overrides {
            if let Some(unknown) = chain.iter().find(|id| registry.get(id).is_none()) {
                return Err(AssetwatchError::ConfigError(format!(
                    "[chain].{} references unknown rule '{}'",
                    category, unknown
                )));
            }
            table.chains.insert(*category, chain.clone());
        }
        Ok(table)
    }

    /// Tasks to run, in order, when a path owned by `task` changes.
    pub fn chain_for(&self, task: &Task) -> Vec<TaskName> {
        self.chains
            .get(&task.rule().category())
            .cloned()
            .unwrap_or_else(|| vec![task.id().to_string()])
    }

    pub fn get(&self, category: Category) -> Option<&[TaskName]> {
        self.chains.get(&category).map(Vec::as_slice)
    }
}
