// Add-only tracking of the sensor-key set.

use std::collections::BTreeSet;

/// Remembers every sensor key announced so far.
///
/// Removals are never reported, and a key that disappears and later
/// returns is not announced twice.
#[derive(Debug, Clone, Default)]
pub struct SchemaTracker {
    seen: BTreeSet<String>,
}

impl SchemaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in `new` that are not in `previous`.
    pub fn diff(previous: &BTreeSet<String>, new: &BTreeSet<String>) -> BTreeSet<String> {
        new.difference(previous).cloned().collect()
    }

    /// Diff `keys` against everything seen so far and remember them.
    pub fn observe(&mut self, keys: &BTreeSet<String>) -> BTreeSet<String> {
        let added = Self::diff(&self.seen, keys);
        self.seen.extend(added.iter().cloned());
        added
    }

    /// Every key ever observed.
    pub fn known(&self) -> &BTreeSet<String> {
        &self.seen
    }
}
