//! Assignment of shared modules to common groups

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use super::chunk::GroupId;
use super::usage::UsageIndex;

/// The ordered set of chunk names requiring a module.
///
/// Two modules land in the same group exactly when their combinations are
/// equal. Names are stored as a list rather than a joined string, so no
/// chunk name can make two combinations collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageCombination(Vec<String>);

impl UsageCombination {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Chunk names in the combination
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for UsageCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("_"))
    }
}

/// Mapping from usage combination to group id
#[derive(Debug, Default)]
pub struct CommonGroups {
    combinations: IndexMap<UsageCombination, GroupId>,
}

impl CommonGroups {
    /// Give every module required by two or more chunks a group id.
    ///
    /// Ids are handed out from 0 in the order combinations are first met
    /// while walking the index. Media queries on the imports that brought a
    /// module in are not part of the combination, so a module imported
    /// unconditionally by one chunk and under a media query by another is
    /// grouped as if both imports were unconditional, which can change the
    /// effective cascade order.
    pub fn assign(index: &mut UsageIndex) -> Self {
        let mut combinations: IndexMap<UsageCombination, GroupId> = IndexMap::new();

        for usage in index.iter_mut() {
            if !usage.is_shared() {
                continue;
            }

            let combination = UsageCombination::new(usage.used_by.iter().cloned());
            let next = combinations.len();
            let group = *combinations.entry(combination).or_insert(next);

            usage.group = Some(group);
        }

        debug!("Assigned {} common group(s)", combinations.len());

        Self { combinations }
    }

    /// Number of groups created
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    /// Combination behind a group id
    pub fn combination(&self, group: GroupId) -> Option<&UsageCombination> {
        self.combinations.get_index(group).map(|(combination, _)| combination)
    }

    /// Group id of a combination
    pub fn group_of(&self, combination: &UsageCombination) -> Option<GroupId> {
        self.combinations.get(combination).copied()
    }

    /// Groups in id order
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &UsageCombination)> {
        self.combinations
            .iter()
            .map(|(combination, &group)| (group, combination))
    }
}
