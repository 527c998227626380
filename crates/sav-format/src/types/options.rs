//! Reader and writer options.

/// Default upper bound on the inflated payload (1 GiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 1 << 30;

/// zlib level the game's own writer uses.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Options for reading save files.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Refuse payloads whose declared or inflated length exceeds this.
    pub max_payload_len: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

impl ReaderOptions {
    /// Create reader options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload size limit.
    #[must_use]
    pub fn with_max_payload_len(mut self, len: usize) -> Self {
        self.max_payload_len = len;
        self
    }
}

/// Options for writing save files.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// zlib compression level, 0-9.
    pub compression_level: u32,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl WriterOptions {
    /// Create writer options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression level. Values above 9 are clamped.
    #[must_use]
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }
}
