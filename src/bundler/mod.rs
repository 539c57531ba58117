//! Common-chunk extraction for stylesheets
//!
//! Finds style modules required by more than one chunk, moves each of them
//! into a shared chunk and replaces them in the original chunks with
//! `@import` rules pointing at the shared chunk.

mod chunk;
mod groups;
mod output;
mod rewrite;
mod usage;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::BuildOptions;
use crate::config::Config;
use crate::extract::{self, Extractor};

pub use chunk::{
    Chunk, ChunkModule, ChunkType, ExtractedModule, GroupId, ImportStub, StyleModule,
    COMMON_CHUNK_PREFIX,
};
pub use groups::{CommonGroups, UsageCombination};
pub use output::{validate_template, AssetMap, Emitter, OutputNamer};
pub use rewrite::ChunkGraphRewriter;
pub use usage::{UnitUsage, UsageIndex};

/// Everything one run of the common-chunk pass produces
#[derive(Debug)]
pub struct PassOutput {
    /// Rewritten original chunks followed by the shared chunks
    pub chunks: Vec<Chunk>,

    /// Group assignment used for the rewrite
    pub groups: CommonGroups,

    /// Usage index the groups were computed from
    pub index: UsageIndex,
}

/// Run the pass over the chunks produced by the extraction step.
///
/// The pass is synchronous and owns all of its state; nothing outlives the
/// returned value.
pub fn optimize_chunks(chunks: Vec<Chunk>, namer: &OutputNamer) -> PassOutput {
    let mut index = UsageIndex::build(&chunks);
    let groups = CommonGroups::assign(&mut index);

    debug!(
        "Indexed {} module(s) across {} chunk(s), {} common group(s)",
        index.len(),
        chunks.len(),
        groups.len()
    );

    let chunks = ChunkGraphRewriter::new(&index, &groups, namer).rewrite(chunks);

    PassOutput {
        chunks,
        groups,
        index,
    }
}

/// Result of a build operation
#[derive(Debug)]
pub struct BuildResult {
    /// Written stylesheets
    pub bundles: Vec<BundleInfo>,

    /// Chunk name to emitted files
    pub manifest: IndexMap<String, Vec<String>>,

    /// Number of common chunks created
    pub common_chunks: usize,
}

/// Information about a written stylesheet
#[derive(Debug)]
pub struct BundleInfo {
    /// Output file path
    pub output_path: PathBuf,

    /// Size in bytes
    pub size: usize,
}

/// Shared group as reported by `analyze`
#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub index: GroupId,
    pub chunks: Vec<String>,
    pub modules: Vec<String>,
}

/// Per-chunk module counts as reported by `analyze`
#[derive(Debug, Serialize)]
pub struct ChunkReport {
    pub name: String,
    pub inline: usize,
    pub shared: usize,
}

/// Usage analysis without any output written
#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub groups: Vec<GroupReport>,
    pub chunks: Vec<ChunkReport>,
}

impl UsageReport {
    fn new(chunks: &[Chunk], index: &UsageIndex, groups: &CommonGroups) -> Self {
        let groups_report = groups
            .iter()
            .map(|(group, combination)| GroupReport {
                index: group,
                chunks: combination.names().to_vec(),
                modules: index
                    .iter()
                    .filter(|usage| usage.group == Some(group))
                    .map(|usage| usage.module.identity().to_string())
                    .collect(),
            })
            .collect();

        let chunks_report = chunks
            .iter()
            .map(|chunk| {
                let shared = chunk
                    .extracted_modules()
                    .filter(|m| index.group_of(m.identity()).is_some())
                    .count();
                ChunkReport {
                    name: chunk.name.clone(),
                    inline: chunk.extracted_modules().count() - shared,
                    shared,
                }
            })
            .collect();

        Self {
            groups: groups_report,
            chunks: chunks_report,
        }
    }
}

/// The main bundler
pub struct Bundler {
    /// Project configuration
    config: Arc<Config>,

    /// Build options
    options: BuildOptions,

    /// Output path templates
    namer: OutputNamer,
}

impl Bundler {
    /// Create a new bundler instance
    pub fn new(config: Config, options: BuildOptions) -> Result<Self> {
        let namer = OutputNamer::from_config(&config.output);

        Ok(Self {
            config: Arc::new(config),
            options,
            namer,
        })
    }

    /// Build the project
    pub fn build(&self) -> Result<BuildResult> {
        let start = Instant::now();

        // 1. Collect extracted chunks
        info!("Extracting stylesheets...");
        let chunks = self.extract_chunks()?;

        // 2. Move shared modules into common chunks
        info!("Extracting common chunks...");
        let PassOutput { mut chunks, groups, .. } = optimize_chunks(chunks, &self.namer);

        // 3. Render assets
        let assets = Emitter::new(&self.namer)
            .minify(self.options.minify)
            .emit(&mut chunks)?;

        // 4. Write output
        info!("Writing {} stylesheet(s)...", assets.len());
        let bundles = self.write_bundles(&assets)?;

        // 5. Generate manifest
        let manifest = self.generate_manifest(&chunks)?;

        debug!("Build completed in {:?}", start.elapsed());

        Ok(BuildResult {
            bundles,
            manifest,
            common_chunks: groups.len(),
        })
    }

    /// Compute usage groups without rewriting or writing anything
    pub fn analyze(&self) -> Result<UsageReport> {
        let chunks = self.extract_chunks()?;
        let mut index = UsageIndex::build(&chunks);
        let groups = CommonGroups::assign(&mut index);

        Ok(UsageReport::new(&chunks, &index, &groups))
    }

    /// Chunks from the extracted-input document, or from the entrypoints
    fn extract_chunks(&self) -> Result<Vec<Chunk>> {
        match &self.options.extracted {
            Some(path) => extract::load_extracted(path),
            None => {
                let extractor = Extractor::new(self.config.clone()).exclude_dir(self.output_dir());
                Ok(extractor.extract_entrypoints()?)
            }
        }
    }

    fn output_dir(&self) -> PathBuf {
        self.options
            .outdir
            .clone()
            .unwrap_or_else(|| self.config.output_dir())
    }

    /// Write assets to disk
    fn write_bundles(&self, assets: &AssetMap) -> Result<Vec<BundleInfo>> {
        let output_dir = self.output_dir();

        fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

        let mut bundles = Vec::with_capacity(assets.len());

        for (filename, code) in assets {
            let output_path = output_dir.join(filename);

            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }

            fs::write(&output_path, code)
                .with_context(|| format!("Failed to write stylesheet: {}", output_path.display()))?;

            bundles.push(BundleInfo {
                output_path,
                size: code.len(),
            });
        }

        Ok(bundles)
    }

    /// Generate asset manifest
    fn generate_manifest(&self, chunks: &[Chunk]) -> Result<IndexMap<String, Vec<String>>> {
        let manifest: IndexMap<String, Vec<String>> = chunks
            .iter()
            .filter(|chunk| !chunk.files.is_empty())
            .map(|chunk| (chunk.name.clone(), chunk.files.clone()))
            .collect();

        if self.config.output.manifest {
            let manifest_path = self.output_dir().join("manifest.json");
            write_manifest(&manifest_path, &manifest)?;
        }

        Ok(manifest)
    }
}

fn write_manifest(path: &Path, manifest: &IndexMap<String, Vec<String>>) -> Result<()> {
    let manifest_json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, manifest_json).context("Failed to write manifest.json")
}
