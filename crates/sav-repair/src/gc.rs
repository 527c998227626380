//! Removal of poles and drones nothing references any more.

use sav_format::EntityId;

use crate::graph::SplineGraph;
use crate::index::EntityIndex;
use crate::report::{ChangeEntry, ChangeReport, DeleteReason};

/// Delete every live pole or drone that no spline end references.
///
/// Returns the deleted identifiers in ascending order.
pub fn collect_garbage(
    index: &mut EntityIndex,
    graph: &SplineGraph,
    report: &mut ChangeReport,
) -> Vec<EntityId> {
    let stale: Vec<_> = index
        .live()
        .filter(|entry| entry.kind.is_collectable() && !graph.is_referenced(entry.id))
        .map(|entry| (entry.id, entry.kind))
        .collect();

    let mut deleted = Vec::with_capacity(stale.len());
    for (id, kind) in stale {
        if index.delete(id) {
            report.push(ChangeEntry::DeleteEntity {
                id,
                kind,
                reason: DeleteReason::Unreferenced,
            });
            deleted.push(id);
        }
    }
    tracing::info!(deleted = deleted.len(), "collected unreferenced entities");
    deleted
}
