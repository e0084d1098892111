use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Asset category a rule (and therefore its task) belongs to.
///
/// The declaration order is the canonical build order: it is the order of
/// the startup build and of the full chain an HTML change escalates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Style,
    Script,
    Font,
    Image,
    Svg,
    Html,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Style,
        Category::Script,
        Category::Font,
        Category::Image,
        Category::Svg,
        Category::Html,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Style => "style",
            Category::Script => "script",
            Category::Font => "font",
            Category::Image => "image",
            Category::Svg => "svg",
            Category::Html => "html",
        }
    }

    /// Transform used for this category when a rule does not name one.
    pub fn default_transform(self) -> TransformKind {
        match self {
            Category::Style | Category::Script => TransformKind::Command,
            Category::Font | Category::Image | Category::Svg => TransformKind::Copy,
            Category::Html => TransformKind::Include,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "style" => Ok(Category::Style),
            "script" => Ok(Category::Script),
            "font" => Ok(Category::Font),
            "image" => Ok(Category::Image),
            "svg" => Ok(Category::Svg),
            "html" => Ok(Category::Html),
            other => Err(format!(
                "invalid category: {other} (expected style, script, font, image, svg or html)"
            )),
        }
    }
}

/// How a rule turns its matched sources into build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Run an external build tool through the shell.
    Command,
    /// Copy matched files, skipping unchanged ones.
    Copy,
    /// Assemble HTML by expanding include directives.
    Include,
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransformKind::Command => "command",
            TransformKind::Copy => "copy",
            TransformKind::Include => "include",
        };
        f.write_str(s)
    }
}
