//! Undoing a previous repair: pole references go back to the nearest junction.

use std::collections::BTreeSet;

use glam::DVec3;
use sav_format::EntityId;

use crate::classify::EntityKind;
use crate::error::Result;
use crate::graph::SplineGraph;
use crate::index::EntityIndex;
use crate::report::{ChangeEntry, ChangeReport, DeleteReason, RepairWarning};

/// Default largest pole-to-junction distance a revert will accept.
pub const DEFAULT_REVERT_RADIUS: f64 = 500.0;

/// Nearest junction to `point`, with its distance. Ties go to the lower id.
fn nearest_junction(junctions: &[(EntityId, DVec3)], point: DVec3) -> Option<(EntityId, f64)> {
    junctions
        .iter()
        .map(|&(id, position)| (id, position.distance(point)))
        .fold(None, |best, (id, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((id, distance)),
        })
}

/// Point every pole reference back at the nearest junction within `radius`
/// and delete the poles that end up unreferenced.
///
/// A pole without a junction in range keeps all of its references and is not
/// deleted, so no spline is left pointing at a missing entity.
pub fn revert_poles(
    index: &mut EntityIndex,
    graph: &mut SplineGraph,
    radius: f64,
    report: &mut ChangeReport,
) -> Result<Vec<EntityId>> {
    let poles: Vec<(EntityId, DVec3)> = index
        .of_kind(EntityKind::InvisiblePole)
        .map(|entry| (entry.id, entry.position()))
        .collect();
    if poles.is_empty() {
        return Ok(Vec::new());
    }
    let junctions: Vec<(EntityId, DVec3)> = index
        .junctions()
        .map(|entry| (entry.id, entry.position()))
        .collect();
    tracing::info!(
        poles = poles.len(),
        junctions = junctions.len(),
        "reverting invisible poles"
    );

    let mut kept = BTreeSet::new();
    for &(pole, position) in &poles {
        let nearest = nearest_junction(&junctions, position);
        for touch in graph.touches(pole) {
            match nearest {
                Some((junction, distance)) if distance <= radius => {
                    graph.rewrite_end(touch.spline, touch.end, pole, junction)?;
                    report.push(ChangeEntry::RewriteReference {
                        spline: touch.spline,
                        end: touch.end,
                        before: pole,
                        after: junction,
                    });
                }
                _ => {
                    kept.insert(pole);
                    report.warn(RepairWarning::UnmatchedPole {
                        pole,
                        spline: touch.spline,
                        nearest: nearest.map(|(_, distance)| distance),
                    });
                }
            }
        }
    }

    let mut deleted = Vec::new();
    for &(pole, _) in &poles {
        if kept.contains(&pole) || !index.delete(pole) {
            continue;
        }
        report.push(ChangeEntry::DeleteEntity {
            id: pole,
            kind: EntityKind::InvisiblePole,
            reason: DeleteReason::Reverted,
        });
        deleted.push(pole);
    }
    Ok(deleted)
}
