//! Command-line interface for css-commons
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `build`: Extract common chunks and write stylesheets
//! - `analyze`: Report which modules would be shared
//! - `watch`: Rebuild whenever a stylesheet changes
//! - `init`: Project scaffolding

mod analyze;
mod build;
mod init;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config::CONFIG_FILE;

pub use analyze::AnalyzeCommand;
pub use build::{BuildCommand, BuildOptions};
pub use init::InitCommand;
pub use watch::WatchCommand;

/// css-commons - Move stylesheet modules shared between entries into common chunks
#[derive(Parser, Debug)]
#[command(name = "css-commons")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to csscommons.toml config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract common chunks and write the stylesheets
    Build(BuildCommand),

    /// Show shared modules and their common chunks without writing
    Analyze(AnalyzeCommand),

    /// Build, then rebuild whenever a stylesheet changes
    Watch(WatchCommand),

    /// Initialize a new project
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        print_banner();

        match &self.command {
            Commands::Build(cmd) => cmd.execute(&self.config).await,
            Commands::Analyze(cmd) => cmd.execute(&self.config).await,
            Commands::Watch(cmd) => cmd.execute(&self.config).await,
            Commands::Init(cmd) => cmd.execute().await,
        }
    }
}

/// Print the css-commons banner
fn print_banner() {
    eprintln!(
        "\n{} {}\n",
        "css-commons".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
