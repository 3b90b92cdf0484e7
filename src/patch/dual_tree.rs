use hashlink::LinkedHashMap;

use crate::filesystem::{PathTree, RelativePath};
use crate::patch::Revision;

/// Revision to fetch each created or modified file from.
///
/// Only paths currently tracked as files in the positive tree have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRegistry {
    versions: LinkedHashMap<RelativePath, Revision>,
}

impl VersionRegistry {
    pub fn record(&mut self, path: &RelativePath, revision: Revision) {
        self.versions.insert(path.clone(), revision);
    }

    pub fn forget(&mut self, path: &RelativePath) -> Option<Revision> {
        self.versions.remove(path)
    }

    /// Drops `path` and every entry below it.
    pub fn forget_subtree(&mut self, path: &RelativePath) {
        let prefix = format!("{}/", path);
        self.versions
            .retain(|tracked, _| tracked != path && !tracked.as_str().starts_with(&prefix));
    }

    pub fn get(&self, path: &RelativePath) -> Option<&Revision> {
        self.versions.get(path)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Working state of one reconciliation run.
///
/// `positive` holds net creations and modifications, `negative` holds net
/// deletions. Mutual exclusion between the two is kept by the reconciliation
/// rules, not by the trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualTree {
    pub positive: PathTree,
    pub negative: PathTree,
    pub versions: VersionRegistry,
}

impl DualTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `path`'s parent was deleted earlier in the run and has not
    /// been brought back in the positive tree.
    pub fn parent_deleted(&self, path: &RelativePath) -> bool {
        !self.positive.contains_ancestor(path) && self.negative.contains_ancestor(path)
    }

    /// Nothing to emit.
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }
}
