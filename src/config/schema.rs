//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Project metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Stylesheets making up one entry chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySources {
    /// A single stylesheet path or glob
    One(String),
    /// Stylesheet paths or globs, in cascade order
    Many(Vec<String>),
}

impl EntrySources {
    /// Patterns in declaration order
    pub fn patterns(&self) -> &[String] {
        match self {
            EntrySources::One(pattern) => std::slice::from_ref(pattern),
            EntrySources::Many(patterns) => patterns,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Filename template for entry stylesheets
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Filename template for common chunks; `[index]` is the group id
    #[serde(default = "default_filename_chunk", alias = "filenameChunk")]
    pub filename_chunk: String,

    /// Generate asset manifest
    #[serde(default = "default_true")]
    pub manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            filename: default_filename(),
            filename_chunk: default_filename_chunk(),
            manifest: true,
        }
    }
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_filename() -> String {
    "[name].css".to_string()
}

fn default_filename_chunk() -> String {
    "common-[index].css".to_string()
}

fn default_true() -> bool {
    true
}
