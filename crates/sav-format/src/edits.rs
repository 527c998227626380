//! Edit sets applied when a save is re-serialized.
//!
//! Edits address records by their position in a table. Anything an edit does
//! not name is copied through byte for byte.

use std::collections::{BTreeMap, BTreeSet};

/// Record appended to the end of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub key: String,
    /// Value as compact JSON text.
    pub value: String,
}

/// Edits against one record table.
#[derive(Debug, Clone, Default)]
pub struct TableEdits {
    pub(crate) removed: BTreeSet<usize>,
    pub(crate) fragments: BTreeMap<usize, BTreeMap<usize, String>>,
    pub(crate) appended: Vec<NewRecord>,
}

impl TableEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Omit a record from the output.
    pub fn remove(&mut self, record: usize) {
        self.removed.insert(record);
    }

    /// Replace one string element of a record's `fragmentValues`.
    pub fn replace_fragment(&mut self, record: usize, fragment: usize, text: impl Into<String>) {
        self.fragments
            .entry(record)
            .or_default()
            .insert(fragment, text.into());
    }

    /// Append a record after the last existing one.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.appended.push(NewRecord {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn is_removed(&self, record: usize) -> bool {
        self.removed.contains(&record)
    }

    /// Replacement text queued for a fragment, if any.
    pub fn fragment(&self, record: usize, fragment: usize) -> Option<&str> {
        self.fragments
            .get(&record)
            .and_then(|patches| patches.get(&fragment))
            .map(String::as_str)
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn appended(&self) -> &[NewRecord] {
        &self.appended
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.fragments.is_empty() && self.appended.is_empty()
    }
}

/// Edits against a whole save file.
#[derive(Debug, Clone, Default)]
pub struct SaveEdits {
    /// Entity container edits.
    pub entities: TableEdits,
    /// Connector table edits.
    pub connectors: TableEdits,
}

impl SaveEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.connectors.is_empty()
    }
}
