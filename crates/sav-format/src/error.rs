//! Error types for save file operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing save files.
///
/// Every variant is fatal: a buffer that fails to parse is never written back.
#[derive(Debug, Error)]
pub enum FormatError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Buffer is shorter than the fixed header.
    #[error("save file truncated: {len} bytes")]
    Truncated { len: usize },

    /// Compression header is not a zlib/deflate stream.
    #[error("unsupported save version: compression header {cmf:#04x} {flg:#04x}")]
    UnsupportedVersion { cmf: u8, flg: u8 },

    /// The zlib stream could not be inflated.
    #[error("corrupt payload stream: {0}")]
    Decompress(std::io::Error),

    /// Declared payload length disagrees with the inflated payload.
    #[error("length header mismatch: header declares {declared} bytes, payload has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Payload exceeds the reader limit or the 32-bit length header.
    #[error("payload too large: {len} bytes (limit {limit})")]
    PayloadTooLarge { len: usize, limit: usize },

    /// Payload is not UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Payload is not well-formed JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Structural framing problem at a byte offset of the payload.
    #[error("invalid record framing at offset {offset}: {message}")]
    Framing { offset: usize, message: String },

    /// No entity container in the payload.
    #[error("missing entity container")]
    MissingEntities,

    /// Two records share an identifier.
    #[error("duplicate entity identifier {id}")]
    DuplicateId { id: u64 },

    /// Two records share a key after editing.
    #[error("duplicate record key {key}")]
    DuplicateKey { key: String },

    /// An edit addresses a record or fragment that does not exist.
    #[error("edit out of range: {message}")]
    InvalidEdit { message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for save format operations.
pub type Result<T> = std::result::Result<T, FormatError>;

impl FormatError {
    /// Create a Framing error.
    pub fn framing(offset: usize, message: impl Into<String>) -> Self {
        Self::Framing {
            offset,
            message: message.into(),
        }
    }

    /// Create an InvalidEdit error.
    pub fn invalid_edit(message: impl Into<String>) -> Self {
        Self::InvalidEdit {
            message: message.into(),
        }
    }
}
