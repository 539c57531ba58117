//! Watch command implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tracing::{debug, error, info};

use crate::cli::build::run_build;
use crate::cli::BuildOptions;
use crate::config::Config;

/// Build, then rebuild whenever a stylesheet changes
#[derive(Args, Debug)]
pub struct WatchCommand {
    /// Output directory
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Minify emitted stylesheets
    #[arg(short, long)]
    pub minify: bool,
}

impl WatchCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path)?;
        let root = config.root.clone();

        let options = BuildOptions {
            outdir: self.outdir.clone(),
            minify: self.minify,
            extracted: None,
        };
        let output_dir = match &options.outdir {
            Some(dir) => std::env::current_dir()?.join(dir),
            None => config.output_dir(),
        };

        rebuild(config, &options);

        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = new_debouncer(Duration::from_millis(100), tx)?;
        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;

        eprintln!(
            "{} Watching {} for changes, press {} to stop\n",
            "→".blue(),
            root.display().to_string().cyan(),
            "Ctrl+C".yellow()
        );

        let config_path = config_path.to_string();

        tokio::task::spawn_blocking(move || {
            // Keep debouncer alive for the duration of the watcher
            let _debouncer = debouncer;

            loop {
                match rx.recv() {
                    Ok(Ok(events)) => {
                        let changed: Vec<&Path> = events
                            .iter()
                            .map(|event| event.path.as_path())
                            .filter(|path| is_relevant(path, &output_dir))
                            .collect();

                        if changed.is_empty() {
                            continue;
                        }

                        for path in &changed {
                            eprintln!(
                                "  {} File changed: {}",
                                "↻".yellow(),
                                path.display().to_string().dimmed()
                            );
                        }

                        match Config::load(&config_path) {
                            Ok(config) => rebuild(config, &options),
                            Err(e) => error!("Failed to reload configuration: {:#}", e),
                        }
                    }
                    Ok(Err(e)) => {
                        error!("Watch error: {:?}", e);
                    }
                    Err(_) => {
                        // Channel closed, exit
                        break;
                    }
                }
            }
        })
        .await?;

        Ok(())
    }
}

fn rebuild(config: Config, options: &BuildOptions) {
    if let Err(e) = run_build(config, options.clone()) {
        error!("Build failed: {:#}", e);
    }
}

/// Stylesheets and the config file, outside the output directory
fn is_relevant(path: &Path, output_dir: &Path) -> bool {
    if path.starts_with(output_dir) {
        debug!("Ignoring output change: {}", path.display());
        return false;
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    extension == "css" || extension == "toml"
}
