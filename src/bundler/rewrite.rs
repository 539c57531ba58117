//! Rewriting of original chunks around the common chunks

use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::debug;

use super::chunk::{Chunk, ChunkModule, GroupId, ImportStub, StyleModule};
use super::groups::CommonGroups;
use super::output::OutputNamer;
use super::usage::UsageIndex;

/// Moves grouped modules out of original chunks into shared chunks
pub struct ChunkGraphRewriter<'a> {
    index: &'a UsageIndex,
    groups: &'a CommonGroups,
    namer: &'a OutputNamer,
}

impl<'a> ChunkGraphRewriter<'a> {
    pub fn new(index: &'a UsageIndex, groups: &'a CommonGroups, namer: &'a OutputNamer) -> Self {
        Self {
            index,
            groups,
            namer,
        }
    }

    /// Rewrite `originals` and return them followed by one shared chunk per
    /// group.
    ///
    /// Shared chunks are returned even when empty; emission skips them.
    pub fn rewrite(&self, originals: Vec<Chunk>) -> Vec<Chunk> {
        let first_shared_id = originals.len();
        let mut shared: Vec<Chunk> = (0..self.groups.len())
            .map(|group| Chunk::shared(group, first_shared_id + group))
            .collect();
        let mut extracted: HashSet<String> = HashSet::new();

        let partitioned: Vec<(Chunk, IndexSet<GroupId>)> = originals
            .into_iter()
            .map(|chunk| self.partition(chunk, &mut shared, &mut extracted))
            .collect();

        // Shared chunks are complete, so their paths (and content hashes) are final.
        let shared_paths: Vec<String> = shared
            .iter()
            .map(|chunk| self.namer.chunk_path(chunk, &chunk.render()))
            .collect();

        let mut chunks: Vec<Chunk> = partitioned
            .into_iter()
            .map(|(mut chunk, required)| {
                self.prepend_imports(&mut chunk, &required, &shared_paths);
                chunk
            })
            .collect();

        chunks.extend(shared);
        chunks
    }

    /// Remove grouped modules from `chunk`, filing first sightings into
    /// their shared chunk. Returns the groups the chunk now depends on, in
    /// first-seen order.
    fn partition(
        &self,
        mut chunk: Chunk,
        shared: &mut [Chunk],
        extracted: &mut HashSet<String>,
    ) -> (Chunk, IndexSet<GroupId>) {
        let mut required = IndexSet::new();
        let mut remaining = Vec::with_capacity(chunk.modules.len());

        for module in chunk.modules {
            let group = module
                .as_extracted()
                .and_then(|m| self.index.group_of(m.identity()));

            let (group, module) = match (group, module) {
                (Some(group), ChunkModule::Extracted(module)) => (group, module),
                (_, module) => {
                    remaining.push(module);
                    continue;
                }
            };

            required.insert(group);

            if extracted.insert(module.identity().to_string()) {
                if let Some(target) = shared.get_mut(group) {
                    target
                        .modules
                        .push(ChunkModule::Extracted(module.extracted_copy()));
                }
            }
        }

        debug!(
            "Chunk '{}': kept {} module(s), requires {} common chunk(s)",
            chunk.name,
            remaining.len(),
            required.len()
        );

        chunk.modules = remaining;
        (chunk, required)
    }

    /// Put one import stub per required group in front of the chunk's
    /// modules, keeping `required` order, which is the cascade order.
    fn prepend_imports(
        &self,
        chunk: &mut Chunk,
        required: &IndexSet<GroupId>,
        shared_paths: &[String],
    ) {
        if required.is_empty() {
            return;
        }

        let stubs: Vec<ChunkModule> = required
            .iter()
            .filter_map(|&group| {
                shared_paths.get(group).map(|path| {
                    ChunkModule::Import(ImportStub::new(group, &self.namer.import_path(chunk, path)))
                })
            })
            .collect();

        let remaining = std::mem::take(&mut chunk.modules);
        chunk.modules = stubs.into_iter().chain(remaining).collect();
    }
}
