//! Removal of splines whose endpoints point at entities missing from the file.

use sav_format::EntityId;

use crate::classify::EntityKind;
use crate::graph::{SplineEnd, SplineGraph};
use crate::index::EntityIndex;
use crate::report::{ChangeEntry, ChangeReport, DeleteReason};

/// Delete dangling splines until none are left.
///
/// Deleting a spline can leave another spline dangling when it was used as an
/// endpoint, so this repeats until a pass finds nothing.
pub fn remove_dangling(
    index: &mut EntityIndex,
    graph: &mut SplineGraph,
    report: &mut ChangeReport,
) -> Vec<EntityId> {
    let mut removed = Vec::new();
    loop {
        let dangling: Vec<EntityId> = graph
            .splines()
            .filter(|spline| {
                SplineEnd::BOTH
                    .iter()
                    .any(|&end| !index.contains(spline.endpoint(end)))
            })
            .map(|spline| spline.id)
            .collect();
        if dangling.is_empty() {
            break;
        }
        for id in dangling {
            graph.remove(id);
            if index.delete(id) {
                report.push(ChangeEntry::DeleteEntity {
                    id,
                    kind: index.kind(id).unwrap_or(EntityKind::Spline),
                    reason: DeleteReason::DanglingSpline,
                });
                removed.push(id);
            }
        }
    }
    if !removed.is_empty() {
        tracing::info!(removed = removed.len(), "removed dangling splines");
    }
    removed
}
