//! Drone-network save file reader and writer.
//!
//! A save is a little-endian `u32` payload length followed by a zlib stream of
//! UTF-8 JSON. The records this crate exposes are the members of the entity
//! container (and of the optional electricity connector table), each keyed by
//! `(ID=N)`.
//!
//! # Fidelity
//!
//! Parsing never re-encodes. Every record keeps the byte span it was read
//! from, and writing splices only the edited records back into the original
//! payload text. A save written with no edits is returned byte-identical.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use sav_format::{SaveEdits, encode_save, read_save};
//!
//! let save = read_save(Path::new("world.sav")).unwrap();
//! println!("{} records", save.records().len());
//!
//! let mut edits = SaveEdits::new();
//! if let Some(idx) = save.records().iter().position(|r| r.id.is_none()) {
//!     edits.entities.remove(idx);
//! }
//! let bytes = encode_save(&save, &edits).unwrap();
//! ```

mod edits;
mod error;
pub mod header;
mod reader;
pub mod scan;
mod types;
mod writer;

pub use edits::{NewRecord, SaveEdits, TableEdits};
pub use error::{FormatError, Result};

pub use types::{
    EntityBody, EntityId, Fragment, Quaternion, ReaderOptions, Record, RecordBody, RecordTable,
    SaveFile, Transform, Vector3, WriterOptions,
};

pub use reader::{
    CONNECTOR_PATH, ENTITY_CONTAINER, SaveReader, parse_save, parse_save_with_options, read_save,
};

pub use writer::{
    SaveWriter, check_edits, encode_save, encode_save_with_options, render_payload, write_save,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
