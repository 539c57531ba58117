//! Chunks of extracted style modules

use std::sync::Arc;

use crate::resolver::find_imports;

/// Index of a shared chunk, assigned per distinct usage combination
pub type GroupId = usize;

/// Name prefix reserved for chunks synthesized by the common-chunk pass
pub const COMMON_CHUNK_PREFIX: &str = "css-common-";

/// The capability every style module exposes to the pass.
///
/// Nothing beyond identity and rendered source is assumed about modules
/// handed over by the extraction step.
pub trait StyleModule {
    /// Stable key, unique across one compilation
    fn identity(&self) -> &str;

    /// Rendered stylesheet source
    fn source(&self) -> &str;
}

/// A unit of style content extracted from a stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedModule {
    identity: String,
    source: Arc<str>,
}

impl ExtractedModule {
    pub fn new(identity: impl Into<String>, source: impl Into<Arc<str>>) -> Self {
        Self {
            identity: identity.into(),
            source: source.into(),
        }
    }

    /// Copy of this module that shares the same source buffer
    pub fn extracted_copy(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            source: Arc::clone(&self.source),
        }
    }
}

impl StyleModule for ExtractedModule {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn source(&self) -> &str {
        &self.source
    }
}

/// Synthetic module pulling a shared chunk in through `@import`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStub {
    group: GroupId,
    id: String,
    directive: String,
}

impl ImportStub {
    /// Create a stub importing the shared chunk of `group` from `path`
    pub fn new(group: GroupId, path: &str) -> Self {
        Self {
            group,
            id: format!("css-import-module-{}", group),
            directive: format!("@import \"{}\";\n", path),
        }
    }

    /// Group whose shared chunk this stub imports
    pub fn group(&self) -> GroupId {
        self.group
    }
}

impl StyleModule for ImportStub {
    fn identity(&self) -> &str {
        &self.id
    }

    fn source(&self) -> &str {
        &self.directive
    }
}

/// Entry in a chunk's ordered module list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkModule {
    /// Real style content
    Extracted(ExtractedModule),
    /// Import of a shared chunk
    Import(ImportStub),
}

impl ChunkModule {
    pub fn as_extracted(&self) -> Option<&ExtractedModule> {
        match self {
            ChunkModule::Extracted(module) => Some(module),
            ChunkModule::Import(_) => None,
        }
    }

    pub fn as_import(&self) -> Option<&ImportStub> {
        match self {
            ChunkModule::Import(stub) => Some(stub),
            ChunkModule::Extracted(_) => None,
        }
    }
}

impl StyleModule for ChunkModule {
    fn identity(&self) -> &str {
        match self {
            ChunkModule::Extracted(module) => module.identity(),
            ChunkModule::Import(stub) => stub.identity(),
        }
    }

    fn source(&self) -> &str {
        match self {
            ChunkModule::Extracted(module) => module.source(),
            ChunkModule::Import(stub) => stub.source(),
        }
    }
}

impl From<ExtractedModule> for ChunkModule {
    fn from(module: ExtractedModule) -> Self {
        ChunkModule::Extracted(module)
    }
}

/// Type of chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// Produced upstream, one per entry point
    Original,
    /// Synthesized to hold modules shared by several original chunks
    Shared { index: GroupId },
}

/// A chunk is an ordered group of style modules emitted as one stylesheet
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk name (used for output filename)
    pub name: String,

    /// Ordinal of the chunk within the compilation
    pub id: usize,

    /// Type of chunk
    pub chunk_type: ChunkType,

    /// Modules in render order
    pub modules: Vec<ChunkModule>,

    /// Output files produced for this chunk
    pub files: Vec<String>,
}

impl Chunk {
    /// Create a new original chunk
    pub fn original(name: impl Into<String>, id: usize, modules: Vec<ChunkModule>) -> Self {
        Self {
            name: name.into(),
            id,
            chunk_type: ChunkType::Original,
            modules,
            files: Vec::new(),
        }
    }

    /// Create a new, empty shared chunk for `index`
    pub fn shared(index: GroupId, id: usize) -> Self {
        Self {
            name: format!("{}{}", COMMON_CHUNK_PREFIX, index),
            id,
            chunk_type: ChunkType::Shared { index },
            modules: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Group index if this is a shared chunk
    pub fn shared_index(&self) -> Option<GroupId> {
        match self.chunk_type {
            ChunkType::Shared { index } => Some(index),
            ChunkType::Original => None,
        }
    }

    /// Check if chunk is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Number of modules in chunk
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Extracted modules, skipping import stubs
    pub fn extracted_modules(&self) -> impl Iterator<Item = &ExtractedModule> {
        self.modules.iter().filter_map(ChunkModule::as_extracted)
    }

    /// Concatenate module sources, each terminated by a newline.
    ///
    /// `@import` rules must precede every other rule, so any left inside a
    /// module (conditional or remote imports) are hoisted to just after the
    /// chunk's import stubs, in module order.
    pub fn render(&self) -> String {
        let mut imports = String::new();
        let mut body = String::new();

        for module in &self.modules {
            match module {
                ChunkModule::Import(stub) => imports.push_str(stub.source()),
                ChunkModule::Extracted(extracted) => {
                    let source = extracted.source();
                    let found = find_imports(source);
                    if found.is_empty() {
                        push_terminated(&mut body, source);
                        continue;
                    }

                    let mut rest = String::with_capacity(source.len());
                    let mut last = 0;
                    for import in found {
                        push_terminated(&mut imports, &source[import.span.clone()]);
                        rest.push_str(&source[last..import.span.start]);
                        last = import.span.end;
                    }
                    rest.push_str(&source[last..]);

                    if !rest.trim().is_empty() {
                        push_terminated(&mut body, &rest);
                    }
                }
            }
        }

        imports.push_str(&body);
        imports
    }
}

fn push_terminated(code: &mut String, source: &str) {
    code.push_str(source);
    if !code.is_empty() && !code.ends_with('\n') {
        code.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_chunk_naming() {
        let chunk = Chunk::shared(3, 7);
        assert_eq!(chunk.name, "css-common-3");
        assert_eq!(chunk.shared_index(), Some(3));
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_import_stub_directive() {
        let stub = ImportStub::new(2, "../common-2.css");
        assert_eq!(stub.group(), 2);
        assert_eq!(stub.source(), "@import \"../common-2.css\";\n");
    }

    #[test]
    fn test_render_terminates_modules() {
        let chunk = Chunk::original(
            "main",
            0,
            vec![
                ChunkModule::Import(ImportStub::new(0, "common-0.css")),
                ExtractedModule::new("a.css", "a { color: red; }").into(),
                ExtractedModule::new("b.css", "b { color: blue; }\n").into(),
            ],
        );

        assert_eq!(
            chunk.render(),
            "@import \"common-0.css\";\na { color: red; }\nb { color: blue; }\n"
        );
    }

    #[test]
    fn test_render_hoists_imports_left_in_modules() {
        let chunk = Chunk::original(
            "main",
            0,
            vec![
                ChunkModule::Import(ImportStub::new(0, "common-0.css")),
                ExtractedModule::new("own.css", ".own {}\n").into(),
                ExtractedModule::new(
                    "print.css",
                    "/* print */\n@import url(p.css) print;\n.print {}\n",
                )
                .into(),
                ExtractedModule::new("fonts.css", "@import \"https://fonts.example/a.css\";").into(),
            ],
        );

        assert_eq!(
            chunk.render(),
            "@import \"common-0.css\";\n@import url(p.css) print;\n@import \"https://fonts.example/a.css\";\n.own {}\n/* print */\n.print {}\n"
        );
    }

    #[test]
    fn test_extracted_copy_shares_source() {
        let module = ExtractedModule::new("a.css", "a {}");
        let copy = module.extracted_copy();
        assert_eq!(copy, module);
        assert!(std::ptr::eq(copy.source(), module.source()));
    }
}
