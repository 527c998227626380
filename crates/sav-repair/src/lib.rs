//! Junction lane repair for drone-network saves.
//!
//! Multi-lane junctions can end up serialized with every lane endpoint sharing
//! the junction's own identifier, which collapses all lanes into one when the
//! save is loaded. This crate rebuilds the lane layout from spline geometry,
//! gives every lane its own invisible pole and rewrites the spline endpoints
//! to match.
//!
//! # Pipeline
//!
//! 1. [`EntityIndex`] and [`SplineGraph`] are built from a parsed save.
//! 2. Splines that reference missing entities are dropped.
//! 3. [`JunctionAnalyzer`] picks a lane axis per junction and clusters the
//!    attached spline ends into [`LaneCluster`]s.
//! 4. The rewriter allocates one pole per cluster and repoints its splines.
//! 5. Poles and drones nothing references are deleted, and references to
//!    deleted entities are purged from surviving records.
//! 6. The edits are spliced back into the original payload.
//!
//! Every step appends to a [`ChangeReport`]. Any error aborts the run before
//! output is produced.
//!
//! # Example
//!
//! ```no_run
//! let input = std::fs::read("world.sav").unwrap();
//! let report = sav_repair::analyze(&input).unwrap();
//! println!("{report}");
//! if !report.is_empty() {
//!     let (output, _) = sav_repair::apply(&input).unwrap();
//!     std::fs::write("world.sav", output).unwrap();
//! }
//! ```

pub mod analyzer;
pub mod classify;
mod dangling;
mod engine;
mod error;
pub mod fragment;
mod gc;
pub mod geometry;
pub mod graph;
pub mod index;
mod inspect;
mod purge;
pub mod report;
mod revert;
mod rewriter;
pub mod template;

pub use analyzer::{
    AnalyzerConfig, AxisSpread, DEFAULT_TOLERANCE, JunctionAnalyzer, JunctionPlan, LaneAxis,
    LaneCluster, cluster_by_value,
};
pub use classify::{Classifier, EntityKind, JunctionKind};
pub use dangling::remove_dangling;
pub use engine::{RepairEngine, RepairOptions, analyze, apply};
pub use error::{ReferenceError, RepairError, Result};
pub use gc::collect_garbage;
pub use graph::{SplineConnection, SplineEnd, SplineGraph, Touch};
pub use index::{EntityEntry, EntityIndex, NewEntity, SpawnKind};
pub use inspect::SaveSummary;
pub use purge::{FragmentPatch, Purge, purge_references};
pub use report::{
    ChangeEntry, ChangeReport, DeleteReason, JunctionSummary, RepairWarning, ReportCounts,
};
pub use revert::{DEFAULT_REVERT_RADIUS, revert_poles};
pub use rewriter::rewrite;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
