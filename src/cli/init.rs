//! Project initialization command

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::config::CONFIG_FILE;

/// Initialize a new project
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Project name / directory
    #[arg(default_value = ".")]
    pub name: String,
}

impl InitCommand {
    pub async fn execute(&self) -> Result<()> {
        let project_dir = Path::new(&self.name);

        eprintln!("{} Initializing new project...\n", "→".blue());

        // Create project directory if needed
        if self.name != "." {
            fs::create_dir_all(project_dir).context("Failed to create project directory")?;
        }

        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            anyhow::bail!("{} already exists", config_path.display());
        }

        fs::write(&config_path, self.generate_config())
            .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;
        eprintln!("  {} Created {}", "✓".green(), CONFIG_FILE.cyan());

        let styles_dir = project_dir.join("styles");
        fs::create_dir_all(&styles_dir).context("Failed to create styles directory")?;

        for (file, content) in SAMPLE_STYLESHEETS {
            fs::write(styles_dir.join(file), content)
                .with_context(|| format!("Failed to write styles/{}", file))?;
            eprintln!("  {} Created {}", "✓".green(), format!("styles/{}", file).cyan());
        }

        eprintln!("\n{} Project initialized successfully!\n", "✓".green().bold());

        eprintln!("  Next steps:");
        if self.name != "." {
            eprintln!("    {} cd {}", "→".dimmed(), self.name.cyan());
        }
        eprintln!("    {} css-commons build", "→".dimmed());
        eprintln!();

        Ok(())
    }

    fn generate_config(&self) -> String {
        let name = if self.name == "." {
            "my-styles"
        } else {
            self.name.as_str()
        };

        format!(
            r#"[project]
name = "{}"
version = "0.1.0"

[entrypoints]
home = ["styles/home.css"]
about = ["styles/about.css"]

[output]
dir = "dist"
filename = "[name].css"
filename_chunk = "common-[index].css"
manifest = true
"#,
            name
        )
    }
}

const SAMPLE_STYLESHEETS: &[(&str, &str)] = &[
    (
        "base.css",
        "body {\n  margin: 0;\n  font-family: system-ui, sans-serif;\n}\n",
    ),
    (
        "home.css",
        "@import \"./base.css\";\n\n.hero {\n  padding: 4rem 2rem;\n}\n",
    ),
    (
        "about.css",
        "@import \"./base.css\";\n\n.team {\n  display: grid;\n}\n",
    ),
];
