//! Spline adjacency.
//!
//! Every spline record contributes one connection between the two entities
//! named by its `StartEntity` and `EndEntity` fields. The graph keeps the
//! current fragment text of each spline so rewrites can be serialized as
//! fragment replacements.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use glam::DVec3;
use sav_format::{EntityId, SaveFile};
use serde::Serialize;

use crate::error::ReferenceError;
use crate::fragment;

/// One of the two endpoint fields of a spline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplineEnd {
    Start,
    End,
}

impl SplineEnd {
    pub const BOTH: [Self; 2] = [Self::Start, Self::End];

    /// Field name inside the spline fragment.
    pub fn field(self) -> &'static str {
        match self {
            Self::Start => "StartEntity",
            Self::End => "EndEntity",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Start => Self::End,
            Self::End => Self::Start,
        }
    }
}

impl fmt::Display for SplineEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// A spline record and the connection it encodes.
#[derive(Debug, Clone)]
pub struct SplineConnection {
    pub id: EntityId,
    /// Position of the record in the entity container.
    pub record: usize,
    /// Position of the spline fragment within `fragmentValues`.
    pub fragment: usize,
    pub start: EntityId,
    pub end: EntityId,
    pub start_pos: Option<DVec3>,
    pub end_pos: Option<DVec3>,
    original: String,
    text: String,
}

impl SplineConnection {
    pub fn endpoint(&self, end: SplineEnd) -> EntityId {
        match end {
            SplineEnd::Start => self.start,
            SplineEnd::End => self.end,
        }
    }

    pub fn position(&self, end: SplineEnd) -> Option<DVec3> {
        match end {
            SplineEnd::Start => self.start_pos,
            SplineEnd::End => self.end_pos,
        }
    }

    /// Current fragment text, including rewrites.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }

    fn endpoint_mut(&mut self, end: SplineEnd) -> &mut EntityId {
        match end {
            SplineEnd::Start => &mut self.start,
            SplineEnd::End => &mut self.end,
        }
    }
}

/// One spline end attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub spline: EntityId,
    pub end: SplineEnd,
    /// Entity at the spline's other end.
    pub neighbor: EntityId,
    /// World position of this end of the spline.
    pub position: Option<DVec3>,
}

/// Splines by identifier plus an endpoint adjacency list.
#[derive(Debug, Clone, Default)]
pub struct SplineGraph {
    splines: BTreeMap<EntityId, SplineConnection>,
    adjacency: HashMap<EntityId, BTreeSet<(EntityId, SplineEnd)>>,
}

impl SplineGraph {
    /// Collect every identified record that carries a spline fragment.
    ///
    /// Only the first spline fragment of a record is used.
    pub fn from_save(save: &SaveFile) -> Self {
        let mut graph = Self::default();
        for (record_idx, record) in save.records().iter().enumerate() {
            let Some(id) = record.id else {
                continue;
            };
            let found = record.text_fragments().find_map(|(fragment_idx, text)| {
                fragment::parse_spline(text).map(|parsed| (fragment_idx, text, parsed))
            });
            if let Some((fragment_idx, text, parsed)) = found {
                graph.insert(SplineConnection {
                    id,
                    record: record_idx,
                    fragment: fragment_idx,
                    start: parsed.start,
                    end: parsed.end,
                    start_pos: parsed.start_pos,
                    end_pos: parsed.end_pos,
                    original: text.to_string(),
                    text: text.to_string(),
                });
            }
        }
        graph
    }

    fn insert(&mut self, spline: SplineConnection) {
        for end in SplineEnd::BOTH {
            self.adjacency
                .entry(spline.endpoint(end))
                .or_default()
                .insert((spline.id, end));
        }
        self.splines.insert(spline.id, spline);
    }

    fn unlink(&mut self, entity: EntityId, spline: EntityId, end: SplineEnd) {
        if let Some(ends) = self.adjacency.get_mut(&entity) {
            ends.remove(&(spline, end));
            if ends.is_empty() {
                self.adjacency.remove(&entity);
            }
        }
    }

    pub fn get(&self, spline: EntityId) -> Option<&SplineConnection> {
        self.splines.get(&spline)
    }

    /// Splines in identifier order.
    pub fn splines(&self) -> impl Iterator<Item = &SplineConnection> {
        self.splines.values()
    }

    pub fn len(&self) -> usize {
        self.splines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splines.is_empty()
    }

    /// `(start, end)` of a spline.
    pub fn endpoints(&self, spline: EntityId) -> Result<(EntityId, EntityId), ReferenceError> {
        self.splines
            .get(&spline)
            .map(|connection| (connection.start, connection.end))
            .ok_or(ReferenceError::UnknownSpline { spline })
    }

    /// Replace whichever end currently equals `old`, start first.
    pub fn rewrite_endpoint(
        &mut self,
        spline: EntityId,
        old: EntityId,
        new: EntityId,
    ) -> Result<SplineEnd, ReferenceError> {
        let (start, end) = self.endpoints(spline)?;
        let which = if start == old {
            SplineEnd::Start
        } else if end == old {
            SplineEnd::End
        } else {
            return Err(ReferenceError::EndpointMismatch {
                spline,
                expected: old,
                start,
                end,
            });
        };
        self.rewrite_end(spline, which, old, new)?;
        Ok(which)
    }

    /// Replace one specific end, which must currently equal `old`.
    pub fn rewrite_end(
        &mut self,
        spline: EntityId,
        end: SplineEnd,
        old: EntityId,
        new: EntityId,
    ) -> Result<(), ReferenceError> {
        let connection = self
            .splines
            .get_mut(&spline)
            .ok_or(ReferenceError::UnknownSpline { spline })?;
        if connection.endpoint(end) != old {
            return Err(ReferenceError::EndpointMismatch {
                spline,
                expected: old,
                start: connection.start,
                end: connection.end,
            });
        }
        let text = fragment::rewrite_endpoint(&connection.text, end, old, new).ok_or(
            ReferenceError::FragmentMismatch {
                spline,
                end,
                expected: old,
            },
        )?;
        connection.text = text;
        *connection.endpoint_mut(end) = new;
        self.unlink(old, spline, end);
        self.adjacency.entry(new).or_default().insert((spline, end));
        Ok(())
    }

    /// Every spline end attached to `entity`, ordered by spline then end.
    pub fn touches(&self, entity: EntityId) -> Vec<Touch> {
        let Some(ends) = self.adjacency.get(&entity) else {
            return Vec::new();
        };
        ends.iter()
            .filter_map(|&(spline, end)| {
                let connection = self.splines.get(&spline)?;
                Some(Touch {
                    spline,
                    end,
                    neighbor: connection.endpoint(end.opposite()),
                    position: connection.position(end),
                })
            })
            .collect()
    }

    /// Drop a spline from the graph.
    pub fn remove(&mut self, spline: EntityId) -> Option<SplineConnection> {
        let connection = self.splines.remove(&spline)?;
        for end in SplineEnd::BOTH {
            self.unlink(connection.endpoint(end), spline, end);
        }
        Some(connection)
    }

    /// Whether any spline end references `entity`.
    pub fn is_referenced(&self, entity: EntityId) -> bool {
        self.adjacency.contains_key(&entity)
    }

    /// Every entity referenced by a spline end.
    pub fn referenced(&self) -> BTreeSet<EntityId> {
        self.adjacency.keys().copied().collect()
    }

    /// Splines whose fragment text changed, with the new text.
    pub fn modified(&self) -> impl Iterator<Item = &SplineConnection> {
        self.splines.values().filter(|spline| spline.is_modified())
    }

    /// Whether `(record, fragment)` is the tracked fragment of a spline.
    pub fn owns_fragment(&self, record: usize, fragment: usize) -> bool {
        self.splines
            .values()
            .any(|spline| spline.record == record && spline.fragment == fragment)
    }
}
