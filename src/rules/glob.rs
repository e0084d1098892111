// src/rules/glob.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::types::Category;

/// Directory names never descended into when walking the project.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

/// One compiled source glob plus its base directory.
///
/// The base is the leading run of literal path segments, e.g.
/// `src/assets/images` for `src/assets/images/**/*.png`. Outputs keep the
/// part of the path below the base.
#[derive(Clone)]
pub struct SourceGlob {
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

impl SourceGlob {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn is_match(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Path of `rel_path` below this glob's base.
    pub fn relative_to_base(&self, rel_path: &str) -> PathBuf {
        let path = Path::new(rel_path);
        match path.strip_prefix(&self.base) {
            Ok(rest) => rest.to_path_buf(),
            Err(_) => path.to_path_buf(),
        }
    }
}

/// Immutable description of one asset category: which files it builds,
/// which files it owns for change detection, and where output goes.
///
/// All patterns are relative to the project root and use `/` separators.
/// `*` does not cross directory boundaries; use `**` for that.
#[derive(Clone)]
pub struct PathRule {
    category: Category,
    sources: Vec<SourceGlob>,
    watch_patterns: Vec<String>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    dest: PathBuf,
}

impl fmt::Debug for PathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRule")
            .field("category", &self.category)
            .field("watch", &self.watch_patterns)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

impl PathRule {
    pub fn new(
        category: Category,
        src: &[String],
        watch: &[String],
        exclude: &[String],
        dest: impl Into<PathBuf>,
    ) -> Result<Self> {
        let mut sources = Vec::with_capacity(src.len());
        for pattern in src {
            let matcher = compile_glob(pattern)?.compile_matcher();
            sources.push(SourceGlob {
                pattern: pattern.clone(),
                base: glob_base(pattern),
                matcher,
            });
        }

        let watch_set = build_globset(watch)
            .with_context(|| format!("building watch globset for {category} rule"))?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for {category} rule"))?,
            )
        };

        Ok(Self {
            category,
            sources,
            watch_patterns: watch.to_vec(),
            watch_set,
            exclude_set,
            dest: dest.into(),
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn sources(&self) -> &[SourceGlob] {
        &self.sources
    }

    pub fn source_patterns(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.pattern()).collect()
    }

    pub fn watch_patterns(&self) -> &[String] {
        &self.watch_patterns
    }

    /// Destination directory, relative to the project root.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Whether a change to `rel_path` belongs to this rule.
    pub fn owns(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path) && !self.is_excluded(rel_path)
    }

    /// The first source glob that selects `rel_path` as build input.
    pub fn source_for(&self, rel_path: &str) -> Option<&SourceGlob> {
        if self.is_excluded(rel_path) {
            return None;
        }
        self.sources.iter().find(|s| s.is_match(rel_path))
    }

    fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude_set
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }
}

/// Leading literal segments of a glob pattern.
///
/// A pattern without any wildcard names a single file, so its base is the
/// file's parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = segments
        .iter()
        .take_while(|seg| !seg.contains(['*', '?', '[', '{']))
        .copied()
        .collect();

    let literal = if literal.len() == segments.len() {
        &literal[..literal.len().saturating_sub(1)]
    } else {
        &literal[..]
    };

    literal
        .iter()
        .filter(|seg| !seg.is_empty() && **seg != ".")
        .collect()
}

/// Concrete paths a glob pattern is known to match.
///
/// `**` is tried both as zero directories and as one directory; other
/// wildcards are filled in with their first literal choice. Patterns with
/// negated character classes yield nothing.
pub fn sample_paths(pattern: &str) -> Vec<String> {
    let mut shallow = Vec::new();
    let mut deep = Vec::new();
    for seg in pattern.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if seg == "**" {
            deep.push("sample".to_string());
            continue;
        }
        let Some(concrete) = concretize_segment(seg) else {
            return Vec::new();
        };
        shallow.push(concrete.clone());
        deep.push(concrete);
    }

    let mut samples = vec![shallow.join("/")];
    let deep = deep.join("/");
    if deep != samples[0] {
        samples.push(deep);
    }
    samples.retain(|s| !s.is_empty());
    samples
}

fn concretize_segment(seg: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = seg.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                out.push_str("sample");
            }
            '?' => out.push('x'),
            '\\' => out.push(chars.next()?),
            '[' => {
                let first = chars.next()?;
                if first == '!' || first == '^' {
                    return None;
                }
                out.push(first);
                while chars.next()? != ']' {}
            }
            '{' => {
                let mut alt = String::new();
                let mut taking = true;
                loop {
                    match chars.next()? {
                        '}' => break,
                        ',' => taking = false,
                        ch if taking => alt.push(ch),
                        _ => {}
                    }
                }
                out.push_str(&concretize_segment(&alt)?);
            }
            _ => out.push(c),
        }
    }
    Some(out)
}

fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}

/// Convert a path under `root` into a `/`-separated relative string.
pub fn relative_to_root(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Some(s)
}

/// Walk `root` and return every file whose relative path satisfies `pred`,
/// sorted by relative path.
///
/// Hidden directories and dependency/output caches (`node_modules`,
/// `target`) are not descended into.
pub fn collect_matching_files<F>(
    fs: &dyn FileSystem,
    root: &Path,
    pred: F,
) -> Result<Vec<(PathBuf, String)>>
where
    F: Fn(&str) -> bool,
{
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                let skip = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.') || SKIPPED_DIRS.contains(&n));
                if !skip {
                    stack.push(path);
                }
            } else if fs.is_file(&path) {
                if let Some(rel) = relative_to_root(root, &path) {
                    if pred(&rel) {
                        files.push((path, rel));
                    }
                }
            }
        }
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(src: &[&str], watch: &[&str], exclude: &[&str]) -> PathRule {
        let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        PathRule::new(Category::Html, &own(src), &own(watch), &own(exclude), "build").unwrap()
    }

    #[test]
    fn glob_base_stops_at_first_wildcard_segment() {
        assert_eq!(glob_base("src/assets/images/**/*.{jpg,png}"), PathBuf::from("src/assets/images"));
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("src/index.html"), PathBuf::from("src"));
        assert_eq!(glob_base("*.html"), PathBuf::new());
        assert_eq!(glob_base("./src/*.js"), PathBuf::from("src"));
    }

    #[test]
    fn sample_paths_fill_in_wildcards() {
        assert_eq!(
            sample_paths("src/assets/images/**/*.{png,jpg}"),
            vec!["src/assets/images/sample.png", "src/assets/images/sample/sample.png"]
        );
        assert_eq!(sample_paths("src/icon-?.[sv]vg"), vec!["src/icon-x.svg"]);
        assert_eq!(sample_paths("./src/*.html"), vec!["src/sample.html"]);
        assert!(sample_paths("src/[!a]*.js").is_empty());
    }

    #[test]
    fn sample_paths_match_their_own_pattern() {
        for pattern in ["src/**/*.html", "src/assets/fonts/**/*", "src/{js,ts}/*.js"] {
            let r = rule(&[pattern], &[pattern], &[]);
            for sample in sample_paths(pattern) {
                assert!(r.owns(&sample), "{pattern} does not own {sample}");
            }
        }
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let r = rule(&["src/*.html"], &["src/*.html"], &[]);
        assert!(r.owns("src/index.html"));
        assert!(!r.owns("src/partials/header.html"));
    }

    #[test]
    fn watch_set_can_be_wider_than_sources() {
        let r = rule(&["src/*.html"], &["src/**/*.html"], &[]);
        assert!(r.owns("src/partials/header.html"));
        assert!(r.source_for("src/partials/header.html").is_none());
        assert!(r.source_for("src/index.html").is_some());
    }

    #[test]
    fn excludes_apply_to_ownership_and_sources() {
        let r = rule(&["src/**/*.html"], &["src/**/*.html"], &["src/drafts/**"]);
        assert!(!r.owns("src/drafts/wip.html"));
        assert!(r.source_for("src/drafts/wip.html").is_none());
    }
}
