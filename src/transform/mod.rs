//! Stylesheet transformation
//!
//! Minification of rendered chunks using lightningcss.

use anyhow::{anyhow, Result};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use tracing::debug;

/// Minify a rendered stylesheet
pub fn minify_css(source: &str, filename: &str) -> Result<String> {
    debug!("Minifying {}", filename);

    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| anyhow!("Failed to parse {}: {}", filename, e))?;

    stylesheet
        .minify(MinifyOptions::default())
        .map_err(|e| anyhow!("Failed to minify {}: {}", filename, e))?;

    let output = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("Failed to print {}: {}", filename, e))?;

    Ok(output.code)
}
