//! Identifier-keyed view of the entity container.
//!
//! The index is the only owner of entity identity during a run. New entities
//! get identifiers above every identifier seen in the file, and nothing is
//! ever reused, including identifiers of deleted entities.

use std::collections::{BTreeMap, BTreeSet};

use glam::DVec3;
use sav_format::{EntityId, SaveFile};

use crate::classify::{Classifier, EntityKind};
use crate::fragment;
use crate::geometry::LocalFrame;

/// An entity read from the save.
#[derive(Debug, Clone)]
pub struct EntityEntry {
    pub id: EntityId,
    /// Position of the record in the entity container.
    pub record: usize,
    pub kind: EntityKind,
    /// Placement from `spawnData.transform`, if the record has one.
    pub frame: Option<LocalFrame>,
}

impl EntityEntry {
    /// World position, defaulting to the origin when the record has no transform.
    pub fn position(&self) -> DVec3 {
        self.frame.map_or(DVec3::ZERO, |frame| frame.origin)
    }
}

/// Entity kinds the index can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    InvisiblePole,
}

impl SpawnKind {
    pub fn entity_kind(self) -> EntityKind {
        match self {
            Self::InvisiblePole => EntityKind::InvisiblePole,
        }
    }
}

/// An entity created during this run, appended on serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub id: EntityId,
    pub kind: SpawnKind,
    pub position: DVec3,
}

/// Lookup, creation and deletion of entities for one run.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    entries: BTreeMap<EntityId, EntityEntry>,
    created: BTreeMap<EntityId, NewEntity>,
    deleted: BTreeSet<EntityId>,
    next_id: u64,
}

impl EntityIndex {
    /// Index every identified record of a save.
    pub fn from_save(save: &SaveFile, classifier: &Classifier) -> Self {
        let mut entries = BTreeMap::new();
        for (record_idx, record) in save.records().iter().enumerate() {
            let Some(id) = record.id else {
                continue;
            };
            let body = record.entity();
            let has_spline = record
                .text_fragments()
                .any(|(_, text)| fragment::parse_spline(text).is_some());
            let config = body.and_then(|body| body.config_path.as_deref());
            let frame = body
                .and_then(|body| body.transform.as_ref())
                .map(LocalFrame::from_transform);
            entries.insert(
                id,
                EntityEntry {
                    id,
                    record: record_idx,
                    kind: classifier.classify_record(config, has_spline),
                    frame,
                },
            );
        }
        let next_id = highest_id(save).map_or(1, |id| id.value().saturating_add(1));
        Self {
            entries,
            created: BTreeMap::new(),
            deleted: BTreeSet::new(),
            next_id,
        }
    }

    /// Entry for an entity read from the save, deleted or not.
    pub fn get(&self, id: EntityId) -> Option<&EntityEntry> {
        self.entries.get(&id)
    }

    /// Whether `id` names a live entity, read or created.
    pub fn contains(&self, id: EntityId) -> bool {
        !self.deleted.contains(&id)
            && (self.entries.contains_key(&id) || self.created.contains_key(&id))
    }

    pub fn kind(&self, id: EntityId) -> Option<EntityKind> {
        if let Some(entry) = self.entries.get(&id) {
            return Some(entry.kind);
        }
        self.created.get(&id).map(|entity| entity.kind.entity_kind())
    }

    /// Allocate a fresh identifier for a new entity.
    pub fn create(&mut self, kind: SpawnKind, position: DVec3) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.created.insert(id, NewEntity { id, kind, position });
        tracing::trace!(id = id.value(), ?kind, "allocated entity");
        id
    }

    /// Mark an entity for omission. Returns `false` if it was already deleted
    /// or never existed.
    pub fn delete(&mut self, id: EntityId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.created.remove(&id);
        self.deleted.insert(id)
    }

    pub fn is_deleted(&self, id: EntityId) -> bool {
        self.deleted.contains(&id)
    }

    /// Live entities read from the save, in identifier order.
    pub fn live(&self) -> impl Iterator<Item = &EntityEntry> {
        self.entries
            .values()
            .filter(|entry| !self.deleted.contains(&entry.id))
    }

    /// Live junctions in identifier order.
    pub fn junctions(&self) -> impl Iterator<Item = &EntityEntry> {
        self.live().filter(|entry| entry.kind.is_junction())
    }

    /// Live entities of one kind in identifier order.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &EntityEntry> {
        self.live().filter(move |entry| entry.kind == kind)
    }

    /// Entities created during this run, in identifier order.
    pub fn created(&self) -> impl Iterator<Item = &NewEntity> {
        self.created.values()
    }

    /// Every identifier deleted during this run.
    pub fn deleted(&self) -> &BTreeSet<EntityId> {
        &self.deleted
    }

    /// Container positions of deleted records read from the save.
    pub fn deleted_records(&self) -> impl Iterator<Item = usize> + '_ {
        self.deleted
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| entry.record))
    }

    pub fn len(&self) -> usize {
        self.live().count() + self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Largest identifier the save mentions: entity keys, connector keys and
/// every `(ID=N)` inside an entity's fragments, dangling or not.
fn highest_id(save: &SaveFile) -> Option<EntityId> {
    let connector_ids = save
        .connectors()
        .into_iter()
        .flat_map(|table| table.records().iter().filter_map(|record| record.id));
    let entity_ids = save.records().iter().flat_map(|record| {
        record.id.into_iter().chain(
            record
                .text_fragments()
                .flat_map(|(_, text)| fragment::mentioned_ids(text)),
        )
    });
    entity_ids.chain(connector_ids).max()
}
