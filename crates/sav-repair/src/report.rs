//! Structured record of what a run changes.

use std::fmt;

use sav_format::EntityId;
use serde::Serialize;

use crate::analyzer::{AxisSpread, JunctionPlan, LaneAxis};
use crate::classify::{EntityKind, JunctionKind};
use crate::graph::SplineEnd;

/// Why an entity is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteReason {
    /// A spline endpoint names an entity missing from the file.
    DanglingSpline,
    /// A pole or drone no spline references.
    Unreferenced,
    /// An invisible pole whose references were restored to a junction.
    Reverted,
}

impl fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DanglingSpline => "dangling spline",
            Self::Unreferenced => "unreferenced",
            Self::Reverted => "reverted",
        })
    }
}

/// One operation of a run. Entries are appended and never changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ChangeEntry {
    CreatePole {
        junction: EntityId,
        pole: EntityId,
        /// Cluster position along the junction's lane axis.
        lane: usize,
        splines: Vec<EntityId>,
        position: [f64; 3],
    },
    RewriteReference {
        spline: EntityId,
        end: SplineEnd,
        before: EntityId,
        after: EntityId,
    },
    DeleteEntity {
        id: EntityId,
        kind: EntityKind,
        reason: DeleteReason,
    },
    PatchFragment {
        entity: EntityId,
        before: String,
        after: String,
    },
    RemoveConnector {
        id: EntityId,
    },
}

impl fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatePole {
                junction,
                pole,
                lane,
                splines,
                position: [x, y, z],
            } => write!(
                f,
                "create pole {pole} for lane {lane} of junction {junction} ({} splines) at ({x:.1}, {y:.1}, {z:.1})",
                splines.len()
            ),
            Self::RewriteReference {
                spline,
                end,
                before,
                after,
            } => write!(f, "rewrite {spline} {end}: {before} -> {after}"),
            Self::DeleteEntity { id, kind, reason } => {
                write!(f, "delete {kind} {id} ({reason})")
            }
            Self::PatchFragment { entity, after, .. } => {
                write!(f, "patch fragment of {entity}: {after}")
            }
            Self::RemoveConnector { id } => write!(f, "remove connector entry {id}"),
        }
    }
}

/// Conditions worth surfacing that do not stop a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "kebab-case")]
pub enum RepairWarning {
    /// No junction needed repair, or no pole needed reverting.
    NothingToRepair,
    /// A spline end at a junction has no position and was given its own lane.
    PositionlessTouch { junction: EntityId, spline: EntityId },
    /// A pole reference had no junction within range; the pole is kept.
    UnmatchedPole {
        pole: EntityId,
        spline: EntityId,
        /// Distance to the nearest junction, if there is any junction at all.
        nearest: Option<f64>,
    },
}

impl fmt::Display for RepairWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToRepair => f.write_str("nothing to repair"),
            Self::PositionlessTouch { junction, spline } => write!(
                f,
                "spline {spline} has no position at junction {junction}; placed in its own lane"
            ),
            Self::UnmatchedPole {
                pole,
                spline,
                nearest: Some(distance),
            } => write!(
                f,
                "pole {pole} on spline {spline}: nearest junction is {distance:.1} away; pole kept"
            ),
            Self::UnmatchedPole {
                pole,
                spline,
                nearest: None,
            } => {
                write!(f, "pole {pole} on spline {spline}: no junctions in save; pole kept")
            }
        }
    }
}

/// Per-junction analysis outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JunctionSummary {
    pub id: EntityId,
    pub kind: JunctionKind,
    pub axis: LaneAxis,
    pub spread: AxisSpread,
    pub touches: usize,
    pub lanes: usize,
}

impl From<&JunctionPlan> for JunctionSummary {
    fn from(plan: &JunctionPlan) -> Self {
        Self {
            id: plan.junction,
            kind: plan.kind,
            axis: plan.axis,
            spread: plan.spread,
            touches: plan.touch_count(),
            lanes: plan.clusters.len(),
        }
    }
}

/// Aggregate counts over a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportCounts {
    pub junctions_repaired: usize,
    pub poles_created: usize,
    pub references_rewritten: usize,
    pub entities_deleted: usize,
    pub fragments_patched: usize,
    pub connectors_removed: usize,
}

/// Append-only change log of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeReport {
    entries: Vec<ChangeEntry>,
    warnings: Vec<RepairWarning>,
    junctions: Vec<JunctionSummary>,
}

impl ChangeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ChangeEntry) {
        tracing::trace!(%entry, "change");
        self.entries.push(entry);
    }

    pub fn warn(&mut self, warning: RepairWarning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn add_junction(&mut self, summary: JunctionSummary) {
        self.junctions.push(summary);
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> &[RepairWarning] {
        &self.warnings
    }

    pub fn junctions(&self) -> &[JunctionSummary] {
        &self.junctions
    }

    /// True when the run changes nothing. Warnings do not count.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn counts(&self) -> ReportCounts {
        let mut counts = ReportCounts {
            junctions_repaired: self.junctions.len(),
            ..ReportCounts::default()
        };
        for entry in &self.entries {
            match entry {
                ChangeEntry::CreatePole { .. } => counts.poles_created += 1,
                ChangeEntry::RewriteReference { .. } => counts.references_rewritten += 1,
                ChangeEntry::DeleteEntity { .. } => counts.entities_deleted += 1,
                ChangeEntry::PatchFragment { .. } => counts.fragments_patched += 1,
                ChangeEntry::RemoveConnector { .. } => counts.connectors_removed += 1,
            }
        }
        counts
    }

    /// Entities deleted for a given reason.
    pub fn deleted(&self, reason: DeleteReason) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().filter_map(move |entry| match entry {
            ChangeEntry::DeleteEntity { id, reason: r, .. } if *r == reason => Some(*id),
            _ => None,
        })
    }
}

impl fmt::Display for ChangeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts();
        writeln!(
            f,
            "{} junctions, {} poles created, {} references rewritten, {} entities deleted",
            counts.junctions_repaired,
            counts.poles_created,
            counts.references_rewritten,
            counts.entities_deleted
        )?;
        for entry in &self.entries {
            writeln!(f, "  {entry}")?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        Ok(())
    }
}
