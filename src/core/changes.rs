use std::collections::BTreeSet;

/// Deduplicated set of work-tree-relative paths awaiting commit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    paths: BTreeSet<String>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed path. Returns `false` if it was already pending.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.paths.insert(path.into())
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Snapshot the pending paths and leave the set empty.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.paths).into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}
