// src/transform/include.rs

//! HTML assembly from partials.
//!
//! A directive looks like `@@include('partials/header.html')` and may carry
//! a JSON object of parameters:
//!
//! ```text
//! @@include('partials/head.html', { "title": "Home" })
//! ```
//!
//! Inside the included file every `@@title` is replaced by `Home`. Paths are
//! resolved relative to the file containing the directive, and included
//! files may include further files.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::rules::glob::collect_matching_files;
use crate::rules::PathRule;
use crate::transform::{Transform, TransformContext, TransformFuture, TransformReport};
use crate::types::TransformKind;

pub const DEFAULT_INCLUDE_PREFIX: &str = "@@";

/// Maximum nesting of includes before giving up.
pub const MAX_INCLUDE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct IncludeTransform {
    prefix: String,
    directive: Regex,
}

impl IncludeTransform {
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = format!(
            r#"{}include\(\s*['"]([^'"]+)['"]\s*(?:,\s*(\{{[\s\S]*?\}}))?\s*\)"#,
            regex::escape(prefix)
        );
        let directive = Regex::new(&pattern)
            .with_context(|| format!("building include directive for prefix '{}'", prefix))?;
        Ok(Self {
            prefix: prefix.to_string(),
            directive,
        })
    }

    /// Expand every directive in `content`, which was read from `file`.
    pub fn render(
        &self,
        fs: &dyn FileSystem,
        file: &Path,
        content: &str,
    ) -> Result<String, TransformError> {
        let mut stack = vec![identity(fs, file)];
        self.expand(fs, file, content, &mut stack)
    }

    fn expand(
        &self,
        fs: &dyn FileSystem,
        file: &Path,
        content: &str,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, TransformError> {
        if stack.len() > MAX_INCLUDE_DEPTH {
            return Err(TransformError::IncludeTooDeep {
                file: file.to_path_buf(),
                max: MAX_INCLUDE_DEPTH,
            });
        }

        let dir = file.parent().unwrap_or_else(|| Path::new(""));
        let mut out = String::with_capacity(content.len());
        let mut last = 0;

        for caps in self.directive.captures_iter(content) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&content[last..whole.start()]);

            let target = dir.join(target.as_str());
            let key = identity(fs, &target);
            if stack.contains(&key) {
                return Err(TransformError::IncludeCycle(target));
            }

            let mut included = fs
                .read_to_string(&target)
                .with_context(|| format!("including {:?} from {:?}", target, file))?;
            if let Some(params) = caps.get(2) {
                included = self.substitute(file, &included, params.as_str())?;
            }

            stack.push(key);
            let expanded = self.expand(fs, &target, &included, stack)?;
            stack.pop();

            out.push_str(&expanded);
            last = whole.end();
        }

        out.push_str(&content[last..]);
        Ok(out)
    }

    fn substitute(&self, file: &Path, text: &str, params: &str) -> Result<String, TransformError> {
        let value: Value =
            serde_json::from_str(params).map_err(|e| TransformError::IncludeParams {
                file: file.to_path_buf(),
                reason: e.to_string(),
            })?;
        let Value::Object(map) = value else {
            return Err(TransformError::IncludeParams {
                file: file.to_path_buf(),
                reason: "parameters must be a JSON object".to_string(),
            });
        };

        // Longest keys first so `@@titleSuffix` is not split by `@@title`.
        let mut entries: Vec<(&String, &Value)> = map.iter().collect();
        entries.sort_by_key(|(k, _)| Reverse(k.len()));

        let mut out = text.to_string();
        for (key, value) in entries {
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out = out.replace(&format!("{}{}", self.prefix, key), &replacement);
        }
        Ok(out)
    }

    fn assemble(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
        rule: &PathRule,
    ) -> Result<TransformReport, TransformError> {
        let dest = root.join(rule.dest());
        let files = collect_matching_files(fs, root, |rel| rule.source_for(rel).is_some())?;

        let mut report = TransformReport::default();
        for (path, rel) in files {
            let Some(source) = rule.source_for(&rel) else {
                continue;
            };
            let content = fs.read_to_string(&path)?;
            let html = self.render(fs, &path, &content)?;
            let out = dest.join(source.relative_to_base(&rel));
            fs.write(&out, html.as_bytes())?;
            debug!(src = %rel, out = ?out, "assembled");
            report.written += 1;
        }
        Ok(report)
    }
}

impl Transform for IncludeTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::Include
    }

    fn run<'a>(
        &'a self,
        task: &'a str,
        rule: &'a PathRule,
        ctx: &'a TransformContext,
    ) -> TransformFuture<'a> {
        let this = self.clone();
        let rule = rule.clone();
        let ctx = ctx.clone();
        let task_name = task.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || this.assemble(ctx.fs.as_ref(), &ctx.root, &rule))
                .await
                .map_err(|e| anyhow!("include task '{}' panicked: {}", task_name, e))?
        })
    }
}

/// Key used for cycle detection.
fn identity(fs: &dyn FileSystem, path: &Path) -> PathBuf {
    fs.canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn transform() -> IncludeTransform {
        IncludeTransform::new(DEFAULT_INCLUDE_PREFIX).unwrap()
    }

    #[test]
    fn resolves_nested_includes_relative_to_the_including_file() {
        let fs = MockFileSystem::new();
        fs.add_file("src/partials/header.html", "<h1>@@include('nav/links.html')</h1>");
        fs.add_file("src/partials/nav/links.html", "<a>home</a>");

        let html = transform()
            .render(
                &fs,
                Path::new("src/index.html"),
                "<body>@@include(\"partials/header.html\")</body>",
            )
            .unwrap();
        assert_eq!(html, "<body><h1><a>home</a></h1></body>");
    }

    #[test]
    fn substitutes_parameters_longest_key_first() {
        let fs = MockFileSystem::new();
        fs.add_file("src/head.html", "<title>@@title@@titleSuffix</title><meta n=@@count>");

        let html = transform()
            .render(
                &fs,
                Path::new("src/index.html"),
                r#"@@include('head.html', { "title": "Home", "titleSuffix": " | Site", "count": 3 })"#,
            )
            .unwrap();
        assert_eq!(html, "<title>Home | Site</title><meta n=3>");
    }

    #[test]
    fn detects_cycles() {
        let fs = MockFileSystem::new();
        fs.add_file("src/a.html", "@@include('b.html')");
        fs.add_file("src/b.html", "@@include('a.html')");

        let err = transform()
            .render(&fs, Path::new("src/a.html"), "@@include('b.html')")
            .unwrap_err();
        assert!(matches!(err, TransformError::IncludeCycle(_)));
    }

    #[test]
    fn rejects_non_object_parameters() {
        let fs = MockFileSystem::new();
        fs.add_file("src/head.html", "x");

        let err = transform()
            .render(&fs, Path::new("src/index.html"), "@@include('head.html', {oops})")
            .unwrap_err();
        assert!(matches!(err, TransformError::IncludeParams { .. }));
    }

    #[test]
    fn missing_partial_is_reported() {
        let fs = MockFileSystem::new();
        let err = transform()
            .render(&fs, Path::new("src/index.html"), "@@include('nope.html')")
            .unwrap_err();
        assert!(err.to_string().contains("nope.html"));
    }

    #[test]
    fn custom_prefix_is_escaped() {
        let fs = MockFileSystem::new();
        fs.add_file("src/foot.html", "<footer>$$year</footer>");
        let t = IncludeTransform::new("$$").unwrap();

        let html = t
            .render(&fs, Path::new("src/index.html"), r#"$$include('foot.html', {"year": 2024})"#)
            .unwrap();
        assert_eq!(html, "<footer>2024</footer>");
    }
}
