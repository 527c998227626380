//! Read-only census of a save.

use std::collections::BTreeMap;

use sav_format::SaveFile;
use serde::Serialize;

use crate::classify::{Classifier, EntityKind, JunctionKind};
use crate::graph::{SplineEnd, SplineGraph};
use crate::index::EntityIndex;

/// Counts describing a save, as reported by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SaveSummary {
    pub file_len: usize,
    pub payload_len: usize,
    /// Members of the entity container, identified or not.
    pub records: usize,
    pub entities: usize,
    pub splines: usize,
    pub junctions: BTreeMap<JunctionKind, usize>,
    /// Junctions that at least one spline end still references.
    pub junctions_touched: usize,
    pub poles: usize,
    pub drones: usize,
    pub connectors: usize,
    /// Splines with an endpoint missing from the save.
    pub dangling_splines: usize,
}

impl SaveSummary {
    pub fn new(save: &SaveFile, classifier: &Classifier) -> Self {
        let index = EntityIndex::from_save(save, classifier);
        let graph = SplineGraph::from_save(save);

        let mut summary = Self {
            file_len: save.source().len(),
            payload_len: save.payload().len(),
            records: save.records().len(),
            entities: index.len(),
            splines: graph.len(),
            connectors: save.connectors().map_or(0, |table| table.len()),
            ..Self::default()
        };
        for entry in index.live() {
            match entry.kind {
                EntityKind::Junction(kind) => {
                    *summary.junctions.entry(kind).or_default() += 1;
                    if graph.is_referenced(entry.id) {
                        summary.junctions_touched += 1;
                    }
                }
                EntityKind::InvisiblePole => summary.poles += 1,
                EntityKind::Drone => summary.drones += 1,
                EntityKind::Spline | EntityKind::Other => {}
            }
        }
        summary.dangling_splines = graph
            .splines()
            .filter(|spline| {
                SplineEnd::BOTH
                    .iter()
                    .any(|&end| !index.contains(spline.endpoint(end)))
            })
            .count();
        summary
    }

    pub fn junction_total(&self) -> usize {
        self.junctions.values().sum()
    }
}
