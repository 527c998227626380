//! One pole per lane.

use crate::analyzer::JunctionPlan;
use crate::error::Result;
use crate::graph::SplineGraph;
use crate::index::{EntityIndex, SpawnKind};
use crate::report::{ChangeEntry, ChangeReport, RepairWarning};

/// Allocate a pole for every cluster of every plan and point the cluster's
/// spline ends at it.
///
/// Fails on the first reference that no longer matches the plan; the caller
/// must then discard the whole run.
pub fn rewrite(
    plans: &[JunctionPlan],
    index: &mut EntityIndex,
    graph: &mut SplineGraph,
    report: &mut ChangeReport,
) -> Result<()> {
    for plan in plans {
        let _span = tracing::info_span!("junction", id = plan.junction.value()).entered();
        for touch in plan.positionless() {
            report.warn(RepairWarning::PositionlessTouch {
                junction: plan.junction,
                spline: touch.spline,
            });
        }
        for (lane, cluster) in plan.clusters.iter().enumerate() {
            let position = cluster.centroid().unwrap_or(plan.origin);
            let pole = index.create(SpawnKind::InvisiblePole, position);
            report.push(ChangeEntry::CreatePole {
                junction: plan.junction,
                pole,
                lane,
                splines: cluster.splines().collect(),
                position: position.to_array(),
            });
            for touch in &cluster.touches {
                graph.rewrite_end(touch.spline, touch.end, plan.junction, pole)?;
                report.push(ChangeEntry::RewriteReference {
                    spline: touch.spline,
                    end: touch.end,
                    before: plan.junction,
                    after: pole,
                });
            }
            tracing::debug!(
                lane,
                pole = pole.value(),
                splines = cluster.len(),
                "created lane pole"
            );
        }
        report.add_junction(plan.into());
    }
    Ok(())
}
