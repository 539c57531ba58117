//! Build command implementation

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::bundler::{BuildResult, Bundler};
use crate::config::Config;
use crate::utils::{format_duration, format_size};

/// Extract common chunks and write the stylesheets
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Output directory
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Minify emitted stylesheets
    #[arg(short, long)]
    pub minify: bool,

    /// Read pre-extracted chunks from a JSON file instead of the entrypoints
    #[arg(long)]
    pub extracted: Option<PathBuf>,
}

impl BuildCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path)?;

        eprintln!("{} Building stylesheets...", "→".blue());

        run_build(config, self.into())
    }
}

/// Run one build and print its summary
pub(crate) fn run_build(config: Config, options: BuildOptions) -> Result<()> {
    let start = Instant::now();

    let bundler = Bundler::new(config, options)?;
    let result = bundler.build()?;

    print_summary(&result, start);

    Ok(())
}

fn print_summary(result: &BuildResult, start: Instant) {
    eprintln!(
        "\n{} Wrote {} stylesheet(s), {} common chunk(s) in {}\n",
        "✓".green().bold(),
        result.bundles.len(),
        result.common_chunks,
        format_duration(start.elapsed())
    );

    for bundle in &result.bundles {
        eprintln!(
            "  {} {} {}",
            "•".dimmed(),
            bundle.output_path.display().to_string().cyan(),
            format_size(bundle.size).dimmed()
        );
    }

    eprintln!();
}

/// Build options derived from command arguments
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub outdir: Option<PathBuf>,
    pub minify: bool,
    pub extracted: Option<PathBuf>,
}

impl From<&BuildCommand> for BuildOptions {
    fn from(cmd: &BuildCommand) -> Self {
        Self {
            outdir: cmd.outdir.clone(),
            minify: cmd.minify,
            extracted: cmd.extracted.clone(),
        }
    }
}
