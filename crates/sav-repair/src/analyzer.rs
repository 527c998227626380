//! Lane detection at junctions.
//!
//! For each junction the attached spline ends are moved into the junction's
//! local frame, a lane-separation axis is picked from the spread of ends that
//! share a neighbor, and the ends are clustered along that axis.

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec3;
use sav_format::EntityId;
use serde::Serialize;

use crate::classify::{EntityKind, JunctionKind};
use crate::geometry;
use crate::graph::{SplineGraph, Touch};
use crate::index::{EntityEntry, EntityIndex};

/// Default merge distance between adjacent ends along the lane axis.
pub const DEFAULT_TOLERANCE: f64 = 15.0;

/// Horizontal axis of a junction's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneAxis {
    X,
    Y,
}

impl LaneAxis {
    pub fn component(self, v: DVec3) -> f64 {
        match self {
            Self::X => v.x,
            Self::Y => v.y,
        }
    }
}

impl fmt::Display for LaneAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::Y => f.write_str("Y"),
        }
    }
}

/// Analyzer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    /// Largest gap along the lane axis that still merges two ends.
    pub tolerance: f64,
    /// Axis used when no neighbor group has two positioned ends.
    pub fallback_axis: LaneAxis,
    /// Axis used when both spread totals are equal.
    pub tie_axis: LaneAxis,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            fallback_axis: LaneAxis::X,
            tie_axis: LaneAxis::Y,
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_fallback_axis(mut self, axis: LaneAxis) -> Self {
        self.fallback_axis = axis;
        self
    }

    pub fn with_tie_axis(mut self, axis: LaneAxis) -> Self {
        self.tie_axis = axis;
        self
    }
}

/// Accumulated spread of neighbor groups along each candidate axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AxisSpread {
    pub x: f64,
    pub y: f64,
    /// Number of neighbor groups that contributed.
    pub groups: usize,
}

/// Spline ends at one junction that belong to the same lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneCluster {
    pub touches: Vec<Touch>,
}

impl LaneCluster {
    /// Splines in the cluster, in touch order.
    pub fn splines(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.touches.iter().map(|touch| touch.spline)
    }

    /// Mean world position of the positioned ends.
    pub fn centroid(&self) -> Option<DVec3> {
        geometry::centroid(self.touches.iter().filter_map(|touch| touch.position))
    }

    pub fn len(&self) -> usize {
        self.touches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touches.is_empty()
    }
}

/// Analysis result for one junction.
#[derive(Debug, Clone, PartialEq)]
pub struct JunctionPlan {
    pub junction: EntityId,
    pub kind: JunctionKind,
    /// World position of the junction itself.
    pub origin: DVec3,
    pub axis: LaneAxis,
    pub spread: AxisSpread,
    /// Clusters ordered along the axis; ends without a position come last.
    pub clusters: Vec<LaneCluster>,
}

impl JunctionPlan {
    pub fn touch_count(&self) -> usize {
        self.clusters.iter().map(LaneCluster::len).sum()
    }

    /// Ends that had no readable position.
    pub fn positionless(&self) -> impl Iterator<Item = &Touch> {
        self.clusters
            .iter()
            .flat_map(|cluster| &cluster.touches)
            .filter(|touch| touch.position.is_none())
    }
}

/// Lane detection over every junction of a save.
#[derive(Debug, Clone, Default)]
pub struct JunctionAnalyzer {
    config: AnalyzerConfig,
}

impl JunctionAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Plan every live junction that at least one spline touches, in
    /// identifier order.
    pub fn analyze(&self, index: &EntityIndex, graph: &SplineGraph) -> Vec<JunctionPlan> {
        index
            .junctions()
            .filter_map(|junction| {
                let touches = graph.touches(junction.id);
                (!touches.is_empty()).then(|| self.plan(junction, touches))
            })
            .collect()
    }

    /// Cluster the ends attached to one junction.
    pub fn plan(&self, junction: &EntityEntry, touches: Vec<Touch>) -> JunctionPlan {
        let frame = junction.frame.unwrap_or_default();
        let kind = match junction.kind {
            EntityKind::Junction(kind) => kind,
            _ => JunctionKind::ThreeWay,
        };

        let mut positioned = Vec::with_capacity(touches.len());
        let mut positionless = Vec::new();
        for touch in touches {
            match touch.position {
                Some(world) => positioned.push((frame.to_local(world), touch)),
                None => positionless.push(touch),
            }
        }

        let (axis, spread) = self.detect_axis(&positioned);
        let values = positioned
            .into_iter()
            .map(|(local, touch)| (axis.component(local), touch))
            .collect();
        let mut clusters: Vec<LaneCluster> = cluster_by_value(values, self.config.tolerance)
            .into_iter()
            .map(|members| LaneCluster {
                touches: members.into_iter().map(|(_, touch)| touch).collect(),
            })
            .collect();
        clusters.extend(positionless.into_iter().map(|touch| LaneCluster {
            touches: vec![touch],
        }));

        tracing::debug!(
            junction = junction.id.value(),
            %axis,
            spread_x = spread.x,
            spread_y = spread.y,
            clusters = clusters.len(),
            "planned junction"
        );

        JunctionPlan {
            junction: junction.id,
            kind,
            origin: frame.origin,
            axis,
            spread,
            clusters,
        }
    }

    /// Pick the lane axis from ends given in local coordinates.
    pub fn detect_axis(&self, local: &[(DVec3, Touch)]) -> (LaneAxis, AxisSpread) {
        let mut groups: BTreeMap<EntityId, Vec<DVec3>> = BTreeMap::new();
        for (position, touch) in local {
            groups.entry(touch.neighbor).or_default().push(*position);
        }

        let mut spread = AxisSpread::default();
        for positions in groups.values().filter(|positions| positions.len() >= 2) {
            spread.x += extent(positions.iter().map(|p| p.x));
            spread.y += extent(positions.iter().map(|p| p.y));
            spread.groups += 1;
        }

        let axis = if spread.groups == 0 {
            self.config.fallback_axis
        } else if spread.x > spread.y {
            LaneAxis::X
        } else if spread.y > spread.x {
            LaneAxis::Y
        } else {
            self.config.tie_axis
        };
        (axis, spread)
    }
}

fn extent(values: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
        (min.min(v), max.max(v))
    });
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}

/// Sort `(value, item)` pairs by value and split wherever two neighbors are
/// more than `tolerance` apart.
pub fn cluster_by_value<T>(mut items: Vec<(f64, T)>, tolerance: f64) -> Vec<Vec<(f64, T)>> {
    items.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut clusters: Vec<Vec<(f64, T)>> = Vec::new();
    for item in items {
        match clusters.last_mut() {
            Some(cluster)
                if cluster
                    .last()
                    .is_some_and(|(prev, _)| (item.0 - prev).abs() <= tolerance) =>
            {
                cluster.push(item);
            }
            _ => clusters.push(vec![item]),
        }
    }
    clusters
}
