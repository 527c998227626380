//! Error types for the repair engine.

use sav_format::{EntityId, FormatError};
use thiserror::Error;

use crate::graph::SplineEnd;

/// A reference in the save disagrees with what analysis recorded.
///
/// Always fatal: it means either a logic bug or a save state the analysis did
/// not anticipate, and writing anyway could leave a worse file behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("unknown spline {spline}")]
    UnknownSpline { spline: EntityId },

    #[error("spline {spline} has no endpoint {expected} (start {start}, end {end})")]
    EndpointMismatch {
        spline: EntityId,
        expected: EntityId,
        start: EntityId,
        end: EntityId,
    },

    #[error("spline {spline} fragment has no {end} reference to {expected}")]
    FragmentMismatch {
        spline: EntityId,
        end: SplineEnd,
        expected: EntityId,
    },
}

/// Errors returned by the repair engine.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("failed to encode entity template: {0}")]
    Template(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RepairError>;
