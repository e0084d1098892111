// src/transform/mod.rs

//! Build transforms.
//!
//! A transform turns the files selected by a [`PathRule`] into output under
//! the rule's destination. The scheduler never looks inside one; it only
//! awaits the result.
//!
//! - [`command`] runs an external build tool (sass, esbuild, ...).
//! - [`copy`] copies matched files, skipping unchanged ones.
//! - [`include`] assembles HTML from partials.
//! - [`hash`] content hashing shared by the above.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;

use crate::config::model::RuleConfig;
use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::rules::PathRule;
use crate::types::TransformKind;

pub mod command;
pub mod copy;
pub mod hash;
pub mod include;

pub use command::CommandTransform;
pub use copy::CopyTransform;
pub use include::{IncludeTransform, DEFAULT_INCLUDE_PREFIX};

/// Boxed future returned by [`Transform::run`].
pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<TransformReport, TransformError>> + Send + 'a>>;

/// What a transform produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Output files written.
    pub written: usize,
    /// Inputs skipped because their output was already current.
    pub skipped: usize,
}

/// Everything a transform needs besides its rule.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Project root; rule globs and destinations are relative to it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

impl TransformContext {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }
}

/// A black-box build step.
pub trait Transform: Send + Sync {
    fn kind(&self) -> TransformKind;

    /// Build every source selected by `rule` into `rule.dest()`.
    ///
    /// `task` is only used for diagnostics.
    fn run<'a>(
        &'a self,
        task: &'a str,
        rule: &'a PathRule,
        ctx: &'a TransformContext,
    ) -> TransformFuture<'a>;
}

impl fmt::Debug for dyn Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform({})", self.kind())
    }
}

/// Construct the transform a rule asks for.
pub fn build_transform(rule: &RuleConfig) -> Result<Arc<dyn Transform>> {
    let transform: Arc<dyn Transform> = match rule.effective_transform() {
        TransformKind::Command => {
            let cmd = rule.cmd.clone().unwrap_or_default();
            Arc::new(CommandTransform::new(cmd))
        }
        TransformKind::Copy => Arc::new(CopyTransform::new()),
        TransformKind::Include => {
            let prefix = rule
                .include_prefix
                .as_deref()
                .unwrap_or(DEFAULT_INCLUDE_PREFIX);
            Arc::new(IncludeTransform::new(prefix)?)
        }
    };
    Ok(transform)
}
