//! Style extraction
//!
//! Produces the per-entry chunks the common-chunk pass consumes, either by
//! reading the stylesheets listed in the configuration or from a JSON
//! document written by another build tool.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use globset::{Glob, GlobMatcher};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::bundler::{Chunk, ChunkModule, ExtractedModule};
use crate::config::Config;
use crate::resolver::Resolver;
use crate::utils::path_to_module_id;

/// Errors raised while collecting stylesheets
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no entrypoints configured")]
    NoEntrypoints,

    #[error("stylesheet not found: {0}")]
    Missing(PathBuf),

    #[error("entrypoint '{entry}': pattern '{pattern}' matched no stylesheets")]
    NoMatch { entry: String, pattern: String },

    #[error("invalid glob pattern '{pattern}'")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to read stylesheet {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("import cycle: {0}")]
    Cycle(String),
}

/// Reads entrypoint stylesheets into chunks of extracted modules
pub struct Extractor {
    config: Arc<Config>,
    resolver: Resolver,
    /// Canonical project root, identities are relative to it
    root: PathBuf,
    /// Directories glob patterns never descend into
    excluded: Vec<PathBuf>,
}

impl Extractor {
    /// The configured output directory is excluded from glob matching
    pub fn new(config: Arc<Config>) -> Self {
        let resolver = Resolver::new(config.root.clone());
        let root = fs::canonicalize(&config.root).unwrap_or_else(|_| config.root.clone());
        let output_dir = config.output_dir();
        let extractor = Self {
            config,
            resolver,
            root,
            excluded: Vec::new(),
        };
        extractor.exclude_dir(output_dir)
    }

    /// Keep glob patterns out of `dir`, e.g. an output directory given on
    /// the command line
    pub fn exclude_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let dir = fs::canonicalize(dir).unwrap_or_else(|_| self.root.join(dir));
        if dir != self.root && !self.excluded.contains(&dir) {
            debug!("Excluding {} from entrypoint globs", dir.display());
            self.excluded.push(dir);
        }
        self
    }

    /// One chunk per entrypoint, in configuration order.
    ///
    /// Every stylesheet becomes one module; its local, unconditional
    /// `@import`s are flattened in front of it.
    pub fn extract_entrypoints(&self) -> Result<Vec<Chunk>, ExtractError> {
        if self.config.entrypoints.is_empty() {
            return Err(ExtractError::NoEntrypoints);
        }

        let mut chunks = Vec::with_capacity(self.config.entrypoints.len());

        for (id, (name, sources)) in self.config.entrypoints.iter().enumerate() {
            let mut modules = Vec::new();
            let mut seen = HashSet::new();

            for pattern in sources.patterns() {
                for path in self.expand_pattern(name, pattern)? {
                    let mut stack = Vec::new();
                    self.collect(&path, &mut stack, &mut seen, &mut modules)?;
                }
            }

            debug!("Entrypoint '{}': {} module(s)", name, modules.len());
            chunks.push(Chunk::original(name.clone(), id, modules));
        }

        Ok(chunks)
    }

    /// Files matched by an entrypoint pattern, sorted when it is a glob
    fn expand_pattern(&self, entry: &str, pattern: &str) -> Result<Vec<PathBuf>, ExtractError> {
        let root = &self.config.root;

        if !is_glob(pattern) {
            let path = root.join(pattern);
            if !path.is_file() {
                return Err(ExtractError::Missing(path));
            }
            return Ok(vec![path]);
        }

        let matcher = compile_glob(pattern)?;
        let mut matches: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| {
                !self.excluded.iter().any(|dir| entry.path() == dir.as_path())
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .map(|relative| matcher.is_match(relative))
                    .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();

        if matches.is_empty() {
            return Err(ExtractError::NoMatch {
                entry: entry.to_string(),
                pattern: pattern.to_string(),
            });
        }

        matches.sort();
        Ok(matches)
    }

    /// Depth-first: imported stylesheets are pushed before their importer
    fn collect(
        &self,
        path: &Path,
        stack: &mut Vec<PathBuf>,
        seen: &mut HashSet<PathBuf>,
        modules: &mut Vec<ChunkModule>,
    ) -> Result<(), ExtractError> {
        let canonical = fs::canonicalize(path).map_err(|_| ExtractError::Missing(path.to_path_buf()))?;

        if stack.contains(&canonical) {
            let cycle: Vec<String> = stack
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| self.identity_of(p))
                .collect();
            return Err(ExtractError::Cycle(cycle.join(" -> ")));
        }

        if !seen.insert(canonical.clone()) {
            return Ok(());
        }

        let source = fs::read_to_string(&canonical).map_err(|source| ExtractError::Read {
            path: canonical.clone(),
            source,
        })?;

        stack.push(canonical.clone());

        let mut flattened = Vec::new();
        for import in self.resolver.extract_imports(&source) {
            // Conditional imports stay in the source with their conditions.
            if import.is_conditional() {
                continue;
            }

            if let Some(target) = self.resolver.resolve(&import.specifier, &canonical) {
                self.collect(&target, stack, seen, modules)?;
                flattened.push(import.span);
            }
        }

        stack.pop();

        let mut own_source = source;
        for span in flattened.into_iter().rev() {
            own_source.replace_range(span, "");
        }

        modules.push(ExtractedModule::new(self.identity_of(&canonical), own_source).into());

        Ok(())
    }

    /// Root-relative identity of a stylesheet
    fn identity_of(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        path_to_module_id(relative)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher, ExtractError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| ExtractError::Glob {
            pattern: pattern.to_string(),
            source,
        })
}

/// Chunks produced by another extraction step
#[derive(Debug, Deserialize)]
struct ExtractedDocument {
    chunks: Vec<ExtractedChunk>,
}

#[derive(Debug, Deserialize)]
struct ExtractedChunk {
    name: String,
    #[serde(default)]
    modules: Vec<ExtractedUnit>,
}

#[derive(Debug, Deserialize)]
struct ExtractedUnit {
    identity: String,
    source: String,
}

/// Parse a JSON document of pre-extracted chunks
pub fn chunks_from_json(json: &str) -> anyhow::Result<Vec<Chunk>> {
    let document: ExtractedDocument =
        serde_json::from_str(json).context("Failed to parse extracted chunks")?;

    Ok(document
        .chunks
        .into_iter()
        .enumerate()
        .map(|(id, chunk)| {
            let modules = chunk
                .modules
                .into_iter()
                .map(|unit| ExtractedModule::new(unit.identity, unit.source).into())
                .collect();
            Chunk::original(chunk.name, id, modules)
        })
        .collect())
}

/// Load pre-extracted chunks from a JSON file
pub fn load_extracted(path: &Path) -> anyhow::Result<Vec<Chunk>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read extracted chunks: {}", path.display()))?;
    chunks_from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::StyleModule;
    use crate::config::EntrySources;
    use pretty_assertions::assert_eq;

    fn config_in(root: &Path, entries: &[(&str, &[&str])]) -> Arc<Config> {
        let mut config = Config::default_config();
        config.root = root.to_path_buf();
        config.entrypoints = entries
            .iter()
            .map(|(name, patterns)| {
                (
                    name.to_string(),
                    EntrySources::Many(patterns.iter().map(|p| p.to_string()).collect()),
                )
            })
            .collect();
        Arc::new(config)
    }

    fn identities(chunk: &Chunk) -> Vec<&str> {
        chunk.modules.iter().map(|m| m.identity()).collect()
    }

    #[test]
    fn test_imports_are_flattened_before_importer() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("styles")).unwrap();
        fs::write(root.join("styles/reset.css"), "* { margin: 0; }\n").unwrap();
        fs::write(
            root.join("styles/base.css"),
            "@import \"reset.css\";\nbody { color: black; }\n",
        )
        .unwrap();
        fs::write(
            root.join("styles/home.css"),
            "@import \"./base.css\";\n@import url(print.css) print;\n.home {}\n",
        )
        .unwrap();

        let extractor = Extractor::new(config_in(root, &[("home", &["styles/home.css"])]));
        let chunks = extractor.extract_entrypoints().unwrap();

        assert_eq!(
            identities(&chunks[0]),
            vec!["styles/reset.css", "styles/base.css", "styles/home.css"]
        );
        assert_eq!(chunks[0].modules[1].source(), "body { color: black; }\n");
        assert_eq!(
            chunks[0].modules[2].source(),
            "@import url(print.css) print;\n.home {}\n"
        );
    }

    #[test]
    fn test_shared_import_is_emitted_once_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("vars.css"), ":root {}\n").unwrap();
        fs::write(root.join("a.css"), "@import 'vars.css';\n.a {}\n").unwrap();
        fs::write(root.join("b.css"), "@import 'vars.css';\n.b {}\n").unwrap();

        let extractor = Extractor::new(config_in(root, &[("main", &["a.css", "b.css"])]));
        let chunks = extractor.extract_entrypoints().unwrap();

        assert_eq!(identities(&chunks[0]), vec!["vars.css", "a.css", "b.css"]);
    }

    #[test]
    fn test_import_cycle_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.css"), "@import 'b.css';\n").unwrap();
        fs::write(root.join("b.css"), "@import 'a.css';\n").unwrap();

        let extractor = Extractor::new(config_in(root, &[("main", &["a.css"])]));

        match extractor.extract_entrypoints() {
            Err(ExtractError::Cycle(cycle)) => assert_eq!(cycle, "a.css -> b.css -> a.css"),
            other => panic!("expected cycle, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_glob_patterns_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pages")).unwrap();
        fs::write(root.join("pages/b.css"), ".b {}").unwrap();
        fs::write(root.join("pages/a.css"), ".a {}").unwrap();
        fs::write(root.join("pages/notes.txt"), "").unwrap();

        let extractor = Extractor::new(config_in(root, &[("pages", &["pages/*.css"])]));
        let chunks = extractor.extract_entrypoints().unwrap();

        assert_eq!(identities(&chunks[0]), vec!["pages/a.css", "pages/b.css"]);
    }

    #[test]
    fn test_globs_skip_output_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pages")).unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::create_dir_all(root.join("out/pages")).unwrap();
        fs::write(root.join("pages/a.css"), ".a {}").unwrap();
        fs::write(root.join("dist/a.css"), ".a {}").unwrap();
        fs::write(root.join("out/pages/a.css"), ".a {}").unwrap();

        let extractor = Extractor::new(config_in(root, &[("pages", &["**/a.css"])]))
            .exclude_dir(root.join("out"));
        let chunks = extractor.extract_entrypoints().unwrap();

        assert_eq!(identities(&chunks[0]), vec!["pages/a.css"]);
    }

    #[test]
    fn test_commented_import_is_not_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("old.css"), ".old {}\n").unwrap();
        fs::write(root.join("a.css"), "/* @import \"old.css\"; */\n.a {}\n").unwrap();

        let extractor = Extractor::new(config_in(root, &[("main", &["a.css"])]));
        let chunks = extractor.extract_entrypoints().unwrap();

        assert_eq!(identities(&chunks[0]), vec!["a.css"]);
        assert_eq!(
            chunks[0].modules[0].source(),
            "/* @import \"old.css\"; */\n.a {}\n"
        );
    }

    #[test]
    fn test_missing_stylesheet() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Extractor::new(config_in(dir.path(), &[("main", &["nope.css"])]));

        assert!(matches!(
            extractor.extract_entrypoints(),
            Err(ExtractError::Missing(_))
        ));
    }

    #[test]
    fn test_unmatched_glob() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Extractor::new(config_in(dir.path(), &[("main", &["*.css"])]));

        assert!(matches!(
            extractor.extract_entrypoints(),
            Err(ExtractError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_chunks_from_json() {
        let json = r#"{
            "chunks": [
                { "name": "a", "modules": [{ "identity": "x", "source": ".x {}" }] },
                { "name": "b" }
            ]
        }"#;

        let chunks = chunks_from_json(json).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name, "a");
        assert_eq!(identities(&chunks[0]), vec!["x"]);
        assert_eq!(chunks[1].id, 1);
        assert!(chunks[1].is_empty());
    }
}
