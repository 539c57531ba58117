//! Stylesheet import resolution
//!
//! Finds `@import` rules in stylesheet source and resolves their targets to
//! files on disk.

use std::ops::Range;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Matches `@import "x";`, `@import 'x';`, `@import url(x);` with optional
/// trailing media/supports conditions
static IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"@import\s+(?:url\(\s*)?(?:"([^"]*)"|'([^']*)'|([^\s"'();]+))\s*\)?\s*([^;]*);[ \t]*\r?\n?"#,
    )
    .unwrap()
});

/// Block comments; an unterminated comment runs to the end of the source
static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?(?:\*/|\z)").unwrap());

/// An `@import` rule found in a stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssImport {
    /// Import target as written
    pub specifier: String,

    /// Media query or `supports()`/`layer` conditions, if any
    pub conditions: Option<String>,

    /// Byte range of the rule, including its line break
    pub span: Range<usize>,
}

impl CssImport {
    /// Whether the import only applies under some condition
    pub fn is_conditional(&self) -> bool {
        self.conditions.is_some()
    }
}

/// Stylesheet resolver
pub struct Resolver {
    /// Directory that `/`-rooted specifiers are resolved against
    root: PathBuf,
}

impl Resolver {
    /// Create a new resolver
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Extract `@import` rules from stylesheet source, in source order
    pub fn extract_imports(&self, source: &str) -> Vec<CssImport> {
        find_imports(source)
    }

    /// Resolve an import specifier to a stylesheet on disk.
    ///
    /// Remote URLs, data URIs and targets that do not exist resolve to
    /// `None` and are left for the browser to load.
    pub fn resolve(&self, specifier: &str, from: &Path) -> Option<PathBuf> {
        if is_remote(specifier) {
            debug!("Skipping remote import: {}", specifier);
            return None;
        }

        let target = match specifier.strip_prefix('/') {
            Some(rooted) => self.root.join(rooted),
            None => from.parent().unwrap_or(Path::new(".")).join(specifier),
        };

        if target.is_file() {
            return Some(target);
        }

        let with_ext = target.with_extension("css");
        if target.extension().is_none() && with_ext.is_file() {
            return Some(with_ext);
        }

        debug!("Unresolved import '{}' from {}", specifier, from.display());
        None
    }
}

/// Find `@import` rules outside of comments, in source order
pub fn find_imports(source: &str) -> Vec<CssImport> {
    let scanned = blank_comments(source);

    let imports: Vec<CssImport> = IMPORT_REGEX
        .captures_iter(&scanned)
        .filter_map(|cap| {
            let specifier = cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3))?;
            let conditions = cap
                .get(4)
                .map(|m| m.as_str().trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            let span = cap.get(0)?.range();

            Some(CssImport {
                specifier: specifier.as_str().to_string(),
                conditions,
                span,
            })
        })
        .collect();

    debug!("Found {} @import rule(s)", imports.len());

    imports
}

/// Replace comment bodies with spaces, keeping every byte offset intact
fn blank_comments(source: &str) -> String {
    let mut scanned = String::with_capacity(source.len());
    let mut last = 0;

    for comment in COMMENT_REGEX.find_iter(source) {
        scanned.push_str(&source[last..comment.start()]);
        for ch in comment.as_str().chars() {
            match ch {
                '\n' => scanned.push('\n'),
                _ => scanned.extend(std::iter::repeat(' ').take(ch.len_utf8())),
            }
        }
        last = comment.end();
    }
    scanned.push_str(&source[last..]);

    scanned
}

fn is_remote(specifier: &str) -> bool {
    specifier.starts_with("//") || specifier.starts_with("data:") || specifier.contains("://")
}
