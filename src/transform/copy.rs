// src/transform/copy.rs

use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::rules::glob::collect_matching_files;
use crate::rules::PathRule;
use crate::transform::hash::same_contents;
use crate::transform::{Transform, TransformContext, TransformFuture, TransformReport};
use crate::types::TransformKind;

/// Copies every matched source into the destination, keeping the path below
/// the source glob's base. Outputs whose contents already match are left
/// untouched so a rebuild only rewrites what changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransform;

impl CopyTransform {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for CopyTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::Copy
    }

    fn run<'a>(
        &'a self,
        task: &'a str,
        rule: &'a PathRule,
        ctx: &'a TransformContext,
    ) -> TransformFuture<'a> {
        let rule = rule.clone();
        let ctx = ctx.clone();
        let task_name = task.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || copy_matching(ctx.fs.as_ref(), &ctx.root, &rule))
                .await
                .map_err(|e| anyhow!("copy task '{}' panicked: {}", task_name, e))?
                .map_err(TransformError::from)
        })
    }
}

fn copy_matching(fs: &dyn FileSystem, root: &Path, rule: &PathRule) -> Result<TransformReport> {
    let dest = root.join(rule.dest());
    let files = collect_matching_files(fs, root, |rel| rule.source_for(rel).is_some())?;

    let mut report = TransformReport::default();
    for (path, rel) in files {
        let Some(source) = rule.source_for(&rel) else {
            continue;
        };
        let out = dest.join(source.relative_to_base(&rel));

        if fs.is_file(&out) && same_contents(fs, &path, &out)? {
            report.skipped += 1;
            continue;
        }

        let bytes = fs.read(&path)?;
        fs.write(&out, &bytes)?;
        debug!(src = %rel, out = ?out, "copied");
        report.written += 1;
    }
    Ok(report)
}
