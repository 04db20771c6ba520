//! Error types for levelcodec.

use thiserror::Error;

/// The result type used throughout levelcodec.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for codec and buffer operations.
///
/// None of these are retried internally; the codec is a pure transform
/// layer and retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Memory for a buffer could not be allocated.
    ///
    /// The buffer that requested the allocation is left unchanged.
    #[error("Allocation failure: could not allocate {requested} bytes")]
    AllocationFailure {
        /// The number of bytes requested.
        requested: usize,
    },

    /// A read or write fell outside the valid region.
    #[error("Bounds violation: {len} bytes at offset {offset} exceeds limit {limit}")]
    BoundsViolation {
        /// Offset of the access.
        offset: usize,
        /// Length of the access.
        len: usize,
        /// The limit that was exceeded.
        limit: usize,
    },

    /// The value decoder met a tag with no handler.
    #[error("Unknown type tag {tag} at offset {offset}")]
    UnknownTypeTag {
        /// The tag byte.
        tag: u8,
        /// Offset of the tag byte.
        offset: usize,
    },

    /// A key or value component could not be coerced to its declared type.
    #[error("Malformed component: {0}")]
    MalformedComponent(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Opaque object or JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The underlying storage engine reported a failure.
    #[error("Engine error: {0}")]
    Engine(String),
}

impl Error {
    /// Creates a new malformed component error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedComponent(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new bounds violation error.
    pub fn bounds(offset: usize, len: usize, limit: usize) -> Self {
        Error::BoundsViolation { offset, len, limit }
    }

    /// Creates a new engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::Engine(msg.into())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::malformed("not a number");
        assert_eq!(err.to_string(), "Malformed component: not a number");

        let err = Error::UnknownTypeTag { tag: 0x2a, offset: 7 };
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("offset 7"));

        let err = Error::bounds(10, 4, 12);
        assert_eq!(err.to_string(), "Bounds violation: 4 bytes at offset 10 exceeds limit 12");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_from_bincode() {
        let bin_err = bincode::deserialize::<String>(&[0xff]).unwrap_err();
        let err: Error = bin_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
