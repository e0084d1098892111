// src/rules/registry.rs

//! Task registry: one task per path rule, looked up by id or by changed path.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::errors::{AssetwatchError, Result};
use crate::fs::FileSystem;
use crate::rules::glob::{collect_matching_files, glob_base, sample_paths, PathRule};
use crate::transform::{build_transform, Transform, TransformContext, TransformFuture};

/// A named, runnable unit of work bound to one path rule.
#[derive(Clone)]
pub struct Task {
    id: TaskName,
    rule: PathRule,
    transform: Arc<dyn Transform>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("category", &self.rule.category())
            .field("transform", &self.transform.kind())
            .finish()
    }
}

impl Task {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rule(&self) -> &PathRule {
        &self.rule
    }

    pub fn transform(&self) -> &Arc<dyn Transform> {
        &self.transform
    }

    /// Run this task's transform over its rule.
    pub fn run<'a>(&'a self, ctx: &'a TransformContext) -> TransformFuture<'a> {
        self.transform.run(&self.id, &self.rule, ctx)
    }
}

/// Ordered set of tasks, at most one per category.
///
/// Tasks are kept in canonical category order (style, script, font, image,
/// svg, html) regardless of registration order.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Build and validate a registry from a loaded config.
    ///
    /// Fails with `ConfigError` when rules overlap or a destination is not
    /// writable. Nothing is built.
    pub fn from_config(cfg: &ConfigFile, fs: &dyn FileSystem, root: &Path) -> Result<Self> {
        let mut registry = TaskRegistry::new();

        for (name, rule_cfg) in cfg.rules().iter() {
            let rule = PathRule::new(
                rule_cfg.category,
                &rule_cfg.src,
                rule_cfg.effective_watch(),
                &rule_cfg.exclude,
                rule_cfg.dest.clone(),
            )
            .map_err(|e| AssetwatchError::ConfigError(format!("rule '{}': {:#}", name, e)))?;

            let transform = build_transform(rule_cfg)
                .map_err(|e| AssetwatchError::ConfigError(format!("rule '{}': {:#}", name, e)))?;
            registry.register(name.clone(), rule, transform)?;
        }

        registry.validate(fs, root)?;
        Ok(registry)
    }

    /// Bind a rule to a transform under `id`.
    pub fn register(
        &mut self,
        id: impl Into<TaskName>,
        rule: PathRule,
        transform: Arc<dyn Transform>,
    ) -> Result<&Task> {
        let id = id.into();

        if let Some(existing) = self.tasks.iter().find(|t| t.id == id) {
            return Err(AssetwatchError::ConfigError(format!(
                "task '{}' is already registered",
                existing.id
            )));
        }
        if let Some(existing) = self
            .tasks
            .iter()
            .find(|t| t.rule.category() == rule.category())
        {
            return Err(AssetwatchError::ConfigError(format!(
                "category '{}' is already owned by task '{}'",
                rule.category(),
                existing.id
            )));
        }

        debug!(task = %id, category = %rule.category(), "registering task");

        let position = self
            .tasks
            .iter()
            .position(|t| t.rule.category() > rule.category())
            .unwrap_or(self.tasks.len());

        self.tasks.insert(
            position,
            Task {
                id,
                rule,
                transform,
            },
        );
        Ok(&self.tasks[position])
    }

    /// All tasks in canonical order.
    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task owning a changed path (relative to the project root), if any.
    ///
    /// A path claimed by more than one rule resolves to nothing.
    pub fn find(&self, rel_path: &str) -> Option<&Task> {
        let mut owners = self.tasks.iter().filter(|t| t.rule.owns(rel_path));
        let first = owners.next()?;
        let rest: Vec<&str> = owners.map(|t| t.id.as_str()).collect();
        if !rest.is_empty() {
            error!(
                path = rel_path,
                owners = %format!("{}, {}", first.id, rest.join(", ")),
                "path is matched by more than one rule; ignoring change"
            );
            return None;
        }
        Some(first)
    }

    /// Check ownership is unambiguous and every destination is writable.
    pub fn validate(&self, fs: &dyn FileSystem, root: &Path) -> Result<()> {
        self.check_identical_patterns()?;
        self.check_overlapping_files(fs, root)?;
        self.check_overlapping_patterns()?;
        self.check_destinations(fs, root)?;
        info!(tasks = self.tasks.len(), "task registry validated");
        Ok(())
    }

    fn check_identical_patterns(&self) -> Result<()> {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for task in &self.tasks {
            for pattern in task.rule.watch_patterns() {
                if let Some(other) = owners.insert(pattern.as_str(), task.id.as_str()) {
                    if other != task.id {
                        return Err(AssetwatchError::ConfigError(format!(
                            "rules '{}' and '{}' both watch '{}'",
                            other, task.id, pattern
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_overlapping_files(&self, fs: &dyn FileSystem, root: &Path) -> Result<()> {
        if !fs.is_dir(root) {
            return Err(AssetwatchError::ConfigError(format!(
                "project root {:?} is not a directory",
                root
            )));
        }

        let files = collect_matching_files(fs, root, |rel| {
            self.tasks.iter().filter(|t| t.rule.owns(rel)).count() > 1
        })?;

        if let Some((_, rel)) = files.first() {
            let owners: Vec<&str> = self
                .tasks
                .iter()
                .filter(|t| t.rule.owns(rel))
                .map(|t| t.id.as_str())
                .collect();
            return Err(AssetwatchError::ConfigError(format!(
                "'{}' is matched by more than one rule ({}); each file must belong to exactly one rule",
                rel,
                owners.join(", ")
            )));
        }
        Ok(())
    }

    /// Reject rule pairs whose watch globs provably share a path, even when
    /// no such file exists yet.
    fn check_overlapping_patterns(&self) -> Result<()> {
        for (i, a) in self.tasks.iter().enumerate() {
            for b in &self.tasks[i + 1..] {
                if let Some(sample) = shared_sample(a, b) {
                    return Err(AssetwatchError::ConfigError(format!(
                        "'{}' would be matched by more than one rule ({}, {}); each file must belong to exactly one rule",
                        sample, a.id, b.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_destinations(&self, fs: &dyn FileSystem, root: &Path) -> Result<()> {
        for task in &self.tasks {
            let dest = root.join(task.rule.dest());
            fs.ensure_writable_dir(&dest).map_err(|e| {
                AssetwatchError::ConfigError(format!(
                    "destination of rule '{}' is not writable: {:#}",
                    task.id, e
                ))
            })?;
        }
        Ok(())
    }
}

/// A sample path from one task's watch globs that both tasks own.
///
/// Only pattern pairs whose literal bases nest are compared.
fn shared_sample(a: &Task, b: &Task) -> Option<String> {
    for pa in a.rule.watch_patterns() {
        for pb in b.rule.watch_patterns() {
            let (base_a, base_b) = (glob_base(pa), glob_base(pb));
            if !base_a.starts_with(&base_b) && !base_b.starts_with(&base_a) {
                continue;
            }
            let found = sample_paths(pa)
                .into_iter()
                .chain(sample_paths(pb))
                .find(|sample| a.rule.owns(sample) && b.rule.owns(sample));
            if found.is_some() {
                return found;
            }
        }
    }
    None
}
