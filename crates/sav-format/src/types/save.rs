//! Parsed save file.

use crate::header::SaveHeader;

use super::{EntityId, Record};

/// An object in the payload whose members are records.
#[derive(Debug, Clone)]
pub struct RecordTable {
    pub(crate) open: usize,
    pub(crate) close: usize,
    pub(crate) records: Vec<Record>,
}

impl RecordTable {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of the record stored under `id`.
    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.records.iter().position(|record| record.id == Some(id))
    }

    pub(crate) fn overlaps(&self, other: &RecordTable) -> bool {
        self.open <= other.close && other.open <= self.close
    }
}

/// A save file held in memory as its original bytes plus the inflated payload
/// and the located record tables.
#[derive(Debug, Clone)]
pub struct SaveFile {
    pub(crate) source: Vec<u8>,
    pub(crate) header: SaveHeader,
    pub(crate) payload: String,
    pub(crate) entities: RecordTable,
    pub(crate) connectors: Option<RecordTable>,
}

impl SaveFile {
    /// The buffer this file was parsed from.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn header(&self) -> SaveHeader {
        self.header
    }

    /// Inflated JSON payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Entity container records in file order.
    pub fn records(&self) -> &[Record] {
        self.entities.records()
    }

    pub fn entities(&self) -> &RecordTable {
        &self.entities
    }

    /// Connector table (`itemData.Mass.electricitySubsystemState.connectorData`).
    pub fn connectors(&self) -> Option<&RecordTable> {
        self.connectors.as_ref()
    }

    /// Raw text of a record as it appears in the payload.
    pub fn record_text(&self, record: &Record) -> &str {
        &self.payload[record.span()]
    }
}
