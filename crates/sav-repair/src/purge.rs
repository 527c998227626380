//! Scrubbing references to deleted entities from the records that survive.

use std::collections::BTreeSet;

use sav_format::{EntityId, SaveFile};

use crate::fragment::{self, EMPTY_INTERSECTION, INTERSECTION_FRAGMENT, SOCKETS_FRAGMENT};
use crate::graph::SplineGraph;
use crate::index::EntityIndex;
use crate::report::{ChangeEntry, ChangeReport};

/// Replacement text for one fragment of a surviving record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentPatch {
    pub record: usize,
    pub fragment: usize,
    pub text: String,
}

/// Edits that remove references to deleted entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Purge {
    /// Connector table positions to drop.
    pub connectors: Vec<usize>,
    pub fragments: Vec<FragmentPatch>,
}

impl Purge {
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty() && self.fragments.is_empty()
    }
}

/// Plan the purge for everything `index` has deleted so far.
///
/// Connector entries of deleted entities are dropped, intersection fragments
/// naming a deleted entity are reset and socket-pair clauses naming one are
/// stripped. Spline fragments are left to the graph.
pub fn purge_references(
    save: &SaveFile,
    index: &EntityIndex,
    graph: &SplineGraph,
    report: &mut ChangeReport,
) -> Purge {
    let deleted = index.deleted();
    let mut purge = Purge::default();
    if deleted.is_empty() {
        return purge;
    }

    if let Some(table) = save.connectors() {
        for (idx, record) in table.records().iter().enumerate() {
            if let Some(id) = record.id
                && deleted.contains(&id)
            {
                purge.connectors.push(idx);
                report.push(ChangeEntry::RemoveConnector { id });
            }
        }
    }

    for (record_idx, record) in save.records().iter().enumerate() {
        let Some(owner) = record.id else {
            continue;
        };
        if deleted.contains(&owner) {
            continue;
        }
        for (fragment_idx, text) in record.text_fragments() {
            if graph.owns_fragment(record_idx, fragment_idx) {
                continue;
            }
            let Some(patched) = patch_fragment(text, deleted) else {
                continue;
            };
            report.push(ChangeEntry::PatchFragment {
                entity: owner,
                before: text.to_string(),
                after: patched.clone(),
            });
            purge.fragments.push(FragmentPatch {
                record: record_idx,
                fragment: fragment_idx,
                text: patched,
            });
        }
    }

    tracing::info!(
        connectors = purge.connectors.len(),
        fragments = purge.fragments.len(),
        "purged references to deleted entities"
    );
    purge
}

fn patch_fragment(text: &str, deleted: &BTreeSet<EntityId>) -> Option<String> {
    if fragment::is_type(text, INTERSECTION_FRAGMENT) {
        let names_deleted = fragment::entity_refs(text).any(|id| deleted.contains(&id));
        return (names_deleted && text != EMPTY_INTERSECTION)
            .then(|| EMPTY_INTERSECTION.to_string());
    }
    if fragment::is_type(text, SOCKETS_FRAGMENT) {
        return fragment::strip_socket_pairs(text, deleted);
    }
    None
}
