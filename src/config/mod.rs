//! Configuration handling for css-commons
//!
//! Parses and manages csscommons.toml configuration files.

mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bundler::validate_template;
use crate::utils::clean_path;

pub use schema::*;

/// Default configuration file name
pub const CONFIG_FILE: &str = "csscommons.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata
    pub project: ProjectConfig,

    /// Entry chunks and their stylesheets; order fixes group numbering
    #[serde(default)]
    pub entrypoints: IndexMap<String, EntrySources>,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Self::parse(&content, root)
    }

    /// Parse configuration text rooted at `root`
    pub fn parse(content: &str, root: PathBuf) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).with_context(|| format!("Failed to parse {}", CONFIG_FILE))?;

        config.root = root;
        config.validate()?;

        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            project: ProjectConfig {
                name: "my-styles".to_string(),
                version: "0.1.0".to_string(),
            },
            entrypoints: {
                let mut map = IndexMap::new();
                map.insert(
                    "main".to_string(),
                    EntrySources::One("styles/main.css".to_string()),
                );
                map
            },
            output: OutputConfig::default(),
            root: PathBuf::from("."),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let output = &self.output;

        if output.filename.trim().is_empty() {
            anyhow::bail!("output.filename must not be empty");
        }

        if output.filename_chunk.trim().is_empty() {
            anyhow::bail!("output.filename_chunk must not be empty");
        }

        for (key, template) in [
            ("output.filename", &output.filename),
            ("output.filename_chunk", &output.filename_chunk),
        ] {
            validate_template(template).with_context(|| format!("Invalid {}", key))?;

            if template.starts_with('/') || clean_path(template).starts_with("..") {
                anyhow::bail!(
                    "{} '{}' must stay inside the output directory",
                    key,
                    template
                );
            }
        }

        if output.filename.contains("[index]") {
            anyhow::bail!(
                "output.filename '{}' uses [index], which only applies to common chunks",
                output.filename
            );
        }

        // Import paths are computed from the directory before content is final.
        if let Some(dir_end) = output.filename.rfind('/') {
            if output.filename[..dir_end].contains("[contenthash") {
                anyhow::bail!(
                    "output.filename '{}' uses [contenthash] in its directory part",
                    output.filename
                );
            }
        }

        if !output.filename_chunk.contains("[index]") {
            warn!(
                "output.filename_chunk '{}' has no [index] placeholder; common chunks will overwrite each other",
                output.filename_chunk
            );
        }

        for (name, sources) in &self.entrypoints {
            if sources.patterns().is_empty() {
                anyhow::bail!("Entrypoint '{}' lists no stylesheets", name);
            }
        }

        Ok(())
    }

    /// Get the absolute output directory path
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output.dir)
    }
}
