//! Save file reader.
//!
//! Inflates the payload, validates it and locates the record tables without
//! re-encoding anything.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::ZlibDecoder;

use crate::error::{FormatError, Result};
use crate::header::{HEADER_LEN, parse_header};
use crate::scan::{self, ObjectSpan};
use crate::types::{ReaderOptions, Record, RecordTable, SaveFile};

/// Name of the member holding the entity container.
pub const ENTITY_CONTAINER: &str = "entities";

/// Path from the payload root to the connector table.
pub const CONNECTOR_PATH: [&str; 4] = [
    "itemData",
    "Mass",
    "electricitySubsystemState",
    "connectorData",
];

/// Save file reader.
pub struct SaveReader<R: Read> {
    reader: BufReader<R>,
    options: ReaderOptions,
}

impl<R: Read> SaveReader<R> {
    /// Create a new save reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            options: ReaderOptions::default(),
        }
    }

    /// Create a new save reader with options.
    pub fn with_options(reader: R, options: ReaderOptions) -> Self {
        Self {
            reader: BufReader::new(reader),
            options,
        }
    }

    /// Read the whole source and parse it.
    pub fn read_save(mut self) -> Result<SaveFile> {
        let mut data = Vec::new();
        self.reader.read_to_end(&mut data)?;
        parse_owned(data, &self.options)
    }
}

impl SaveReader<File> {
    /// Open a save file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    /// Open a save file with options.
    pub fn open_with_options(path: &Path, options: ReaderOptions) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FormatError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                FormatError::Io(e)
            }
        })?;
        Ok(Self::with_options(file, options))
    }
}

/// Read a save file from a path.
pub fn read_save(path: &Path) -> Result<SaveFile> {
    SaveReader::open(path)?.read_save()
}

/// Parse a save file from an in-memory buffer.
pub fn parse_save(data: &[u8]) -> Result<SaveFile> {
    parse_save_with_options(data, &ReaderOptions::default())
}

/// Parse a save file from an in-memory buffer with options.
pub fn parse_save_with_options(data: &[u8], options: &ReaderOptions) -> Result<SaveFile> {
    parse_owned(data.to_vec(), options)
}

fn parse_owned(source: Vec<u8>, options: &ReaderOptions) -> Result<SaveFile> {
    let header = parse_header(&source)?;
    if header.payload_len > options.max_payload_len {
        return Err(FormatError::PayloadTooLarge {
            len: header.payload_len,
            limit: options.max_payload_len,
        });
    }

    let payload = inflate(&source[HEADER_LEN..], header.payload_len, options)?;
    if payload.len() != header.payload_len {
        return Err(FormatError::LengthMismatch {
            declared: header.payload_len,
            actual: payload.len(),
        });
    }
    let payload = String::from_utf8(payload)?;
    serde_json::from_str::<serde::de::IgnoredAny>(&payload)?;

    let root = scan::skip_ws(payload.as_bytes(), 0);
    let entity_span = scan::find_object(&payload, root, ENTITY_CONTAINER)?
        .ok_or(FormatError::MissingEntities)?;
    let entities = entity_table(&payload, entity_span)?;

    let connectors = match scan::find_path(&payload, root, &CONNECTOR_PATH)? {
        Some(span) => {
            let table = opaque_table(span);
            // A connector table nested in the entity container is just entity data.
            (!table.overlaps(&entities)).then_some(table)
        }
        None => None,
    };

    tracing::debug!(
        payload_len = payload.len(),
        records = entities.len(),
        connectors = connectors.as_ref().map_or(0, RecordTable::len),
        "parsed save"
    );

    Ok(SaveFile {
        source,
        header,
        payload,
        entities,
        connectors,
    })
}

fn inflate(stream: &[u8], expected: usize, options: &ReaderOptions) -> Result<Vec<u8>> {
    let limit = options.max_payload_len as u64;
    let mut payload = Vec::with_capacity(expected);
    ZlibDecoder::new(stream)
        .take(limit + 1)
        .read_to_end(&mut payload)
        .map_err(FormatError::Decompress)?;
    if payload.len() > options.max_payload_len {
        return Err(FormatError::PayloadTooLarge {
            len: payload.len(),
            limit: options.max_payload_len,
        });
    }
    Ok(payload)
}

fn entity_table(payload: &str, span: ObjectSpan) -> Result<RecordTable> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(span.members.len());
    for member in span.members {
        let record = Record::parse_entity(payload, member)?;
        if let Some(id) = record.id
            && !seen.insert(id)
        {
            return Err(FormatError::DuplicateId { id: id.value() });
        }
        records.push(record);
    }
    Ok(RecordTable {
        open: span.open,
        close: span.close,
        records,
    })
}

fn opaque_table(span: ObjectSpan) -> RecordTable {
    RecordTable {
        open: span.open,
        close: span.close,
        records: span.members.into_iter().map(Record::opaque).collect(),
    }
}
