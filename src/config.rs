//! Configuration options for the codec layer.

/// Default capacity above which a cleared buffer is reallocated smaller.
pub const DEFAULT_SHRINK_THRESHOLD: usize = 8192;

/// Configuration options for building a [`Codec`](crate::Codec).
#[derive(Debug, Clone)]
pub struct Options {
    /// Capacity (in bytes) above which `clear(true)` frees a buffer and
    /// reallocates it at exactly this size.
    /// Default: 8KB
    pub shrink_threshold: usize,

    /// Text transcoding used for string values and string key components.
    /// Default: TextEncoding::Utf8
    pub text_encoding: TextEncoding,

    /// Memory access strategy.
    /// Default: BackendKind::Auto (direct if the probe succeeds)
    pub backend: BackendKind,

    /// Maximum nesting depth accepted by the value decoder.
    /// Default: 256
    pub max_nesting: usize,

    /// Number of idle buffer pools retained by the pool cache.
    /// Default: 16
    pub pool_cache_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            shrink_threshold: DEFAULT_SHRINK_THRESHOLD,
            text_encoding: TextEncoding::Utf8,
            backend: BackendKind::Auto,
            max_nesting: 256,
            pool_cache_size: 16,
        }
    }
}

/// Text transcodings supported by native buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TextEncoding {
    /// UTF-8, one to four bytes per character.
    #[default]
    Utf8 = 0,

    /// UTF-16, two bytes per code unit, big-endian.
    Utf16 = 1,
}

impl TextEncoding {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TextEncoding::Utf8),
            1 => Some(TextEncoding::Utf16),
            _ => None,
        }
    }
}

/// Memory backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BackendKind {
    /// Probe the direct backend and fall back to the native one.
    #[default]
    Auto = 0,

    /// Raw allocator with direct pointer access (fast).
    Direct = 1,

    /// Handle table behind a lock (always available, slower).
    Native = 2,
}

impl BackendKind {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BackendKind::Auto),
            1 => Some(BackendKind::Direct),
            2 => Some(BackendKind::Native),
            _ => None,
        }
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shrink threshold.
    pub fn shrink_threshold(mut self, size: usize) -> Self {
        self.shrink_threshold = size;
        self
    }

    /// Sets the text encoding.
    pub fn text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.text_encoding = encoding;
        self
    }

    /// Sets the memory backend.
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.backend = kind;
        self
    }

    /// Sets the maximum decode nesting depth.
    pub fn max_nesting(mut self, depth: usize) -> Self {
        self.max_nesting = depth;
        self
    }

    /// Sets the pool cache size.
    pub fn pool_cache_size(mut self, size: usize) -> Self {
        self.pool_cache_size = size;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.shrink_threshold == 0 {
            return Err(crate::Error::invalid_argument("shrink_threshold must be > 0"));
        }
        if self.max_nesting == 0 {
            return Err(crate::Error::invalid_argument("max_nesting must be > 0"));
        }
        if self.pool_cache_size == 0 {
            return Err(crate::Error::invalid_argument("pool_cache_size must be > 0"));
        }
        Ok(())
    }
}
