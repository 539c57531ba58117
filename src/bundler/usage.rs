//! Usage index: which chunks require which style modules

use indexmap::{IndexMap, IndexSet};

use super::chunk::{Chunk, ExtractedModule, GroupId, StyleModule};

/// Usage record for one module identity
#[derive(Debug, Clone)]
pub struct UnitUsage {
    /// First-seen instance of the module
    pub module: ExtractedModule,

    /// Names of the chunks including the module, in chunk order
    pub used_by: IndexSet<String>,

    /// Shared group, if the module is extracted into a common chunk
    pub group: Option<GroupId>,
}

impl UnitUsage {
    /// Whether more than one chunk requires this module
    pub fn is_shared(&self) -> bool {
        self.used_by.len() > 1
    }
}

/// Global index of style modules keyed by identity
#[derive(Debug, Default)]
pub struct UsageIndex {
    units: IndexMap<String, UnitUsage>,
}

impl UsageIndex {
    /// Index every extracted module of `chunks`.
    ///
    /// The first chunk to include an identity provides the module instance;
    /// later sightings only add their chunk name to `used_by`.
    pub fn build(chunks: &[Chunk]) -> Self {
        let mut units: IndexMap<String, UnitUsage> = IndexMap::new();

        for chunk in chunks {
            for module in chunk.extracted_modules() {
                let usage = units
                    .entry(module.identity().to_string())
                    .or_insert_with(|| UnitUsage {
                        module: module.extracted_copy(),
                        used_by: IndexSet::new(),
                        group: None,
                    });

                usage.used_by.insert(chunk.name.clone());
            }
        }

        Self { units }
    }

    /// Usage record for an identity
    pub fn get(&self, identity: &str) -> Option<&UnitUsage> {
        self.units.get(identity)
    }

    /// Shared group assigned to an identity
    pub fn group_of(&self, identity: &str) -> Option<GroupId> {
        self.units.get(identity).and_then(|usage| usage.group)
    }

    /// Usage records in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &UnitUsage> {
        self.units.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut UnitUsage> {
        self.units.values_mut()
    }

    /// Number of distinct identities
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::chunk::ChunkModule;

    fn module(identity: &str, source: &str) -> ChunkModule {
        ExtractedModule::new(identity, source).into()
    }

    #[test]
    fn test_records_every_consumer() {
        let chunks = vec![
            Chunk::original("a", 0, vec![module("x", "x {}"), module("y", "y {}")]),
            Chunk::original("b", 1, vec![module("y", "y {}")]),
        ];

        let index = UsageIndex::build(&chunks);

        assert_eq!(index.len(), 2);
        let y = index.get("y").unwrap();
        assert_eq!(y.used_by.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(y.is_shared());
        assert!(!index.get("x").unwrap().is_shared());
    }

    #[test]
    fn test_repeat_in_same_chunk_counts_once() {
        let chunks = vec![Chunk::original(
            "a",
            0,
            vec![module("x", "x {}"), module("x", "x {}")],
        )];

        let index = UsageIndex::build(&chunks);

        assert_eq!(index.get("x").unwrap().used_by.len(), 1);
    }

    #[test]
    fn test_first_payload_wins() {
        let chunks = vec![
            Chunk::original("a", 0, vec![module("x", "first")]),
            Chunk::original("b", 1, vec![module("x", "second")]),
        ];

        let index = UsageIndex::build(&chunks);

        assert_eq!(index.get("x").unwrap().module.source(), "first");
    }

    #[test]
    fn test_import_stubs_are_not_indexed() {
        use crate::bundler::chunk::ImportStub;

        let chunks = vec![Chunk::original(
            "a",
            0,
            vec![ChunkModule::Import(ImportStub::new(0, "common-0.css"))],
        )];

        assert!(UsageIndex::build(&chunks).is_empty());
    }
}
