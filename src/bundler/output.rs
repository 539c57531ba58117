//! Output naming and asset emission

use anyhow::{bail, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use super::chunk::{Chunk, GroupId};
use crate::config::OutputConfig;
use crate::transform;
use crate::utils::{clean_path, content_hash, relative_path};

/// Placeholder tokens understood in filename templates; only `contenthash`
/// takes a length
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(name|id|index|contenthash)(?::(\d+))?\]").unwrap()
});

/// Default length of a `[contenthash]` substitution
const DEFAULT_HASH_LENGTH: usize = 8;

/// Emitted assets keyed by output path
pub type AssetMap = IndexMap<String, String>;

/// Values substituted into a filename template
struct PathData<'a> {
    name: &'a str,
    id: usize,
    index: Option<GroupId>,
    content: Option<&'a str>,
}

/// Hash length requested by a `[contenthash:N]` token; `None` means the
/// length suffix is not valid for this token
fn token_length(caps: &Captures<'_>) -> Option<usize> {
    match (&caps[1], caps.get(2)) {
        (_, None) => Some(DEFAULT_HASH_LENGTH),
        ("contenthash", Some(len)) => len.as_str().parse().ok().filter(|len| *len > 0),
        _ => None,
    }
}

fn render_template(template: &str, data: &PathData<'_>) -> String {
    TOKEN_REGEX
        .replace_all(template, |caps: &Captures<'_>| {
            let token = &caps[0];
            let Some(len) = token_length(caps) else {
                return token.to_string();
            };
            match &caps[1] {
                "name" => data.name.to_string(),
                "id" => data.id.to_string(),
                "index" => data
                    .index
                    .map(|index| index.to_string())
                    .unwrap_or_else(|| token.to_string()),
                "contenthash" => match data.content {
                    Some(content) => content_hash(content.as_bytes(), len),
                    None => token.to_string(),
                },
                _ => token.to_string(),
            }
        })
        .into_owned()
}

/// Reject tokens carrying a length they cannot honour, such as `[name:4]`
/// or `[contenthash:0]`
pub fn validate_template(template: &str) -> Result<()> {
    for caps in TOKEN_REGEX.captures_iter(template) {
        if token_length(&caps).is_none() {
            bail!(
                "Invalid token '{}' in '{}': only [contenthash:N] takes a length, with N >= 1",
                &caps[0],
                template
            );
        }
    }
    Ok(())
}

/// Directory part of a template path, `""` when there is none
fn template_dir(template: &str) -> &str {
    template.rfind('/').map(|pos| &template[..pos]).unwrap_or("")
}

/// Computes output paths for original and shared chunks
#[derive(Debug, Clone)]
pub struct OutputNamer {
    filename: String,
    filename_chunk: String,
}

impl OutputNamer {
    pub fn new(filename: impl Into<String>, filename_chunk: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            filename_chunk: filename_chunk.into(),
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(output.filename.clone(), output.filename_chunk.clone())
    }

    fn template_for(&self, chunk: &Chunk) -> &str {
        if chunk.shared_index().is_some() {
            &self.filename_chunk
        } else {
            &self.filename
        }
    }

    /// Output path of `chunk` given its rendered content
    pub fn chunk_path(&self, chunk: &Chunk, content: &str) -> String {
        let path = render_template(
            self.template_for(chunk),
            &PathData {
                name: &chunk.name,
                id: chunk.id,
                index: chunk.shared_index(),
                content: Some(content),
            },
        );
        clean_path(&path)
    }

    /// Output directory of `chunk`; never depends on content
    pub fn chunk_dir(&self, chunk: &Chunk) -> String {
        let dir = render_template(
            template_dir(self.template_for(chunk)),
            &PathData {
                name: &chunk.name,
                id: chunk.id,
                index: chunk.shared_index(),
                content: None,
            },
        );
        clean_path(&dir)
    }

    /// Path of `target` as referenced from a stylesheet emitted for `from`
    pub fn import_path(&self, from: &Chunk, target: &str) -> String {
        relative_path(&self.chunk_dir(from), target)
    }
}

/// Renders non-empty chunks into an asset map
pub struct Emitter<'a> {
    namer: &'a OutputNamer,
    minify: bool,
}

impl<'a> Emitter<'a> {
    pub fn new(namer: &'a OutputNamer) -> Self {
        Self {
            namer,
            minify: false,
        }
    }

    /// Minify rendered stylesheets before registering them
    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Register every non-empty chunk under its output path.
    ///
    /// Content hashes are taken from the unminified rendering so they agree
    /// with the paths used by import stubs.
    pub fn emit(&self, chunks: &mut [Chunk]) -> Result<AssetMap> {
        let mut assets = AssetMap::new();

        for chunk in chunks.iter_mut() {
            if chunk.is_empty() {
                debug!("Skipping empty chunk '{}'", chunk.name);
                continue;
            }

            let code = chunk.render();
            let path = self.namer.chunk_path(chunk, &code);
            let code = if self.minify {
                transform::minify_css(&code, &path)?
            } else {
                code
            };

            if assets.insert(path.clone(), code).is_some() {
                warn!(
                    "Chunk '{}' overwrites asset {}; check the filename templates",
                    chunk.name, path
                );
            }

            chunk.files.push(path);
        }

        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::chunk::{ChunkModule, ExtractedModule, ImportStub};

    fn chunk_with(name: &str, id: usize, source: &str) -> Chunk {
        Chunk::original(
            name,
            id,
            vec![ChunkModule::from(ExtractedModule::new(name, source))],
        )
    }

    #[test]
    fn test_shared_index_substitution() {
        let namer = OutputNamer::new("[name].css", "common-[index].css");
        let shared = Chunk::shared(0, 3);

        assert_eq!(namer.chunk_path(&shared, ""), "common-0.css");
    }

    #[test]
    fn test_original_tokens() {
        let namer = OutputNamer::new("css/[name].[id].[contenthash:4].css", "common-[index].css");
        let chunk = chunk_with("home", 2, "a {}");

        let expected = format!("css/home.2.{}.css", content_hash(b"a {}", 4));
        assert_eq!(namer.chunk_path(&chunk, "a {}"), expected);
    }

    #[test]
    fn test_length_suffix_only_applies_to_contenthash() {
        let namer = OutputNamer::new("[name:4].[contenthash:0].[contenthash:2].css", "c.css");
        let chunk = chunk_with("home", 0, "");

        let expected = format!("[name:4].[contenthash:0].{}.css", content_hash(b"a {}", 2));
        assert_eq!(namer.chunk_path(&chunk, "a {}"), expected);
    }

    #[test]
    fn test_validate_template() {
        assert!(validate_template("[name].[contenthash:12].css").is_ok());
        assert!(validate_template("common-[index].css").is_ok());
        assert!(validate_template("[name:4].css").is_err());
        assert!(validate_template("common-[index:2].css").is_err());
        assert!(validate_template("[id:1].css").is_err());
        assert!(validate_template("[contenthash:0].css").is_err());
    }

    #[test]
    fn test_unknown_tokens_are_kept() {
        let namer = OutputNamer::new("[name].[ext]", "common.css");
        let chunk = chunk_with("home", 0, "");

        assert_eq!(namer.chunk_path(&chunk, ""), "home.[ext]");
    }

    #[test]
    fn test_import_path_is_relative_to_referencing_chunk() {
        let namer = OutputNamer::new("css/[name].css", "common-[index].css");
        let chunk = chunk_with("home", 0, "");

        assert_eq!(namer.import_path(&chunk, "common-0.css"), "../common-0.css");
    }

    #[test]
    fn test_import_path_in_same_directory() {
        let namer = OutputNamer::new("[name].css", "common-[index].css");
        let chunk = chunk_with("home", 0, "");

        assert_eq!(namer.import_path(&chunk, "common-0.css"), "common-0.css");
    }

    #[test]
    fn test_import_path_with_named_directory() {
        let namer = OutputNamer::new("./[name]/style.css", "shared/common-[index].css");
        let chunk = chunk_with("home", 0, "");

        assert_eq!(namer.chunk_dir(&chunk), "home");
        assert_eq!(
            namer.import_path(&chunk, "shared/common-1.css"),
            "../shared/common-1.css"
        );
    }

    #[test]
    fn test_emit_skips_empty_chunks() {
        let namer = OutputNamer::new("[name].css", "common-[index].css");
        let mut chunks = vec![chunk_with("home", 0, "a {}"), Chunk::shared(0, 1)];

        let assets = Emitter::new(&namer).emit(&mut chunks).unwrap();

        assert_eq!(assets.len(), 1);
        assert_eq!(assets.get("home.css").map(String::as_str), Some("a {}\n"));
        assert_eq!(chunks[0].files, vec!["home.css".to_string()]);
        assert!(chunks[1].files.is_empty());
    }

    #[test]
    fn test_emit_minifies_chunk_with_import_in_later_module() {
        let namer = OutputNamer::new("[name].css", "common-[index].css");
        let mut chunks = vec![Chunk::original(
            "a",
            0,
            vec![
                ChunkModule::Import(ImportStub::new(0, "common-0.css")),
                ExtractedModule::new("own.css", ".own { color: red; }\n").into(),
                ExtractedModule::new("print.css", "@import url(p.css) print;\n.print { margin: 0px; }\n")
                    .into(),
            ],
        )];

        let assets = Emitter::new(&namer).minify(true).emit(&mut chunks).unwrap();

        let code = &assets["a.css"];
        let print = code.find("p.css").unwrap();
        let own = code.find(".own").unwrap();
        assert!(code.starts_with("@import"));
        assert!(code.find("common-0.css").unwrap() < print);
        assert!(print < own);
        assert!(code.contains(".print{margin:0}"));
    }

    #[test]
    fn test_emit_overwrites_colliding_paths() {
        let namer = OutputNamer::new("[name].css", "common.css");
        let mut first = Chunk::shared(0, 1);
        first.modules.push(ExtractedModule::new("x", "x {}").into());
        let mut second = Chunk::shared(1, 2);
        second.modules.push(ExtractedModule::new("y", "y {}").into());
        let mut chunks = vec![first, second];

        let assets = Emitter::new(&namer).emit(&mut chunks).unwrap();

        assert_eq!(assets.len(), 1);
        assert_eq!(assets.get("common.css").map(String::as_str), Some("y {}\n"));
    }
}
