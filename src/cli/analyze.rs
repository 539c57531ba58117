//! Analyze command implementation

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::bundler::{Bundler, UsageReport};
use crate::cli::BuildOptions;
use crate::config::Config;

/// Show shared modules and their common chunks without writing
#[derive(Args, Debug)]
pub struct AnalyzeCommand {
    /// Read pre-extracted chunks from a JSON file instead of the entrypoints
    #[arg(long)]
    pub extracted: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl AnalyzeCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path)?;

        let options = BuildOptions {
            extracted: self.extracted.clone(),
            ..BuildOptions::default()
        };
        let report = Bundler::new(config, options)?.analyze()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        Ok(())
    }
}

fn print_report(report: &UsageReport) {
    if report.groups.is_empty() {
        eprintln!("{} No modules are shared between chunks\n", "✓".green());
    }

    for group in &report.groups {
        eprintln!(
            "{} {} {}",
            format!("common-{}", group.index).bold().cyan(),
            "←".dimmed(),
            group.chunks.join(", ")
        );
        for module in &group.modules {
            eprintln!("  {} {}", "•".dimmed(), module);
        }
    }

    eprintln!();

    for chunk in &report.chunks {
        eprintln!(
            "  {} {} {} inline, {} shared",
            "•".dimmed(),
            chunk.name.cyan(),
            chunk.inline,
            chunk.shared
        );
    }

    eprintln!();
}
