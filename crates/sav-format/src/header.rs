//! Fixed header handling.
//!
//! # Structure
//!
//! | Offset | Length | Field        | Description                              |
//! |--------|--------|--------------|------------------------------------------|
//! | 0-3    | 4      | payload_len  | Inflated payload length, little-endian   |
//! | 4-5    | 2      | cmf, flg     | zlib stream header (RFC 1950)            |
//! | 6-     | n      | stream       | Deflate data followed by Adler-32        |

use crate::error::{FormatError, Result};

/// Length of the fixed length header in bytes.
pub const HEADER_LEN: usize = 4;

/// Minimum buffer size: length header plus zlib stream header.
pub const MIN_FILE_LEN: usize = HEADER_LEN + 2;

/// zlib compression method for deflate.
const CM_DEFLATE: u8 = 8;

/// Largest deflate window exponent (CINFO) allowed by RFC 1950.
const MAX_CINFO: u8 = 7;

/// Parsed fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveHeader {
    /// Declared inflated payload length.
    pub payload_len: usize,
}

/// Parse the length header and validate the stream header that follows it.
pub fn parse_header(data: &[u8]) -> Result<SaveHeader> {
    if data.len() < MIN_FILE_LEN {
        return Err(FormatError::Truncated { len: data.len() });
    }
    let mut len_bytes = [0u8; HEADER_LEN];
    len_bytes.copy_from_slice(&data[..HEADER_LEN]);
    validate_stream_header(data[HEADER_LEN], data[HEADER_LEN + 1])?;
    Ok(SaveHeader {
        payload_len: u32::from_le_bytes(len_bytes) as usize,
    })
}

/// Reject anything that is not a plain zlib/deflate stream.
///
/// Preset dictionaries are refused as well; the game never writes them.
pub fn validate_stream_header(cmf: u8, flg: u8) -> Result<()> {
    let method = cmf & 0x0F;
    let cinfo = cmf >> 4;
    let check = (u16::from(cmf) << 8) | u16::from(flg);
    let preset_dict = flg & 0x20 != 0;
    if method != CM_DEFLATE || cinfo > MAX_CINFO || check % 31 != 0 || preset_dict {
        return Err(FormatError::UnsupportedVersion { cmf, flg });
    }
    Ok(())
}

/// Build the length header for a payload.
pub fn build_header(payload_len: usize) -> Result<[u8; HEADER_LEN]> {
    let len = u32::try_from(payload_len).map_err(|_| FormatError::PayloadTooLarge {
        len: payload_len,
        limit: u32::MAX as usize,
    })?;
    Ok(len.to_le_bytes())
}
