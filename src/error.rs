//! Error types for evtarc

use std::io;
use thiserror::Error;

/// Result type for evtarc operations
pub type Result<T> = std::result::Result<T, EvtarcError>;

/// Coarse classification of an [`EvtarcError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-contract input
    Data,
    /// Well-formed input carrying a value this implementation cannot represent
    Limit,
    /// Broken internal invariant (a bug in the caller or the codec)
    Internal,
    /// Underlying stream failure other than a short read
    Io,
    /// Invalid configuration
    Config,
}

/// Errors that can occur while encoding or decoding archives
#[derive(Debug, Error)]
pub enum EvtarcError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input ended in the middle of a value
    #[error("Unexpected end of data while reading {0}")]
    Truncated(&'static str),

    /// Continuation bit still set after the last group a width can hold
    #[error("Invalid varint: continuation past {max_bytes} bytes for a {bits}-bit integer")]
    VarIntOverlong {
        /// Target integer width
        bits: u32,
        /// Maximum encoded length for that width
        max_bytes: usize,
    },

    /// Decoded varint does not fit the target integer
    #[error("Varint value does not fit in a {bits}-bit integer")]
    VarIntOutOfRange {
        /// Target integer width
        bits: u32,
    },

    /// Variant type tag is not a known scalar or array tag
    #[error("Unknown variant type tag {0:#06x}")]
    UnknownVariantType(u16),

    /// Variant holds a different type or arity than requested
    #[error("Variant type mismatch: expected {expected}, found {found}")]
    VariantTypeMismatch {
        /// Requested shape
        expected: String,
        /// Stored shape
        found: String,
    },

    /// Class name not known to the record dispatcher
    #[error("Unknown archive class: {0:?}")]
    UnknownClass(String),

    /// Wide string byte length that is negative or odd
    #[error("Invalid wide string byte length: {0}")]
    InvalidWideStringLength(i64),

    /// Format version this codec cannot read or write
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(i32),

    /// Archive header requests compression or encryption
    #[error("Unsupported archive mode: compression {compression}, encryption {encryption}")]
    UnsupportedMode {
        /// Compression mode from the header
        compression: i32,
        /// Encryption mode from the header
        encryption: i32,
    },

    /// Descriptor required by a conversion is absent
    #[error("Missing descriptor: {0}")]
    MissingDescriptor(String),

    /// Any other structural problem in the input
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    /// Value out of range for a checked cast or a configured decode limit
    #[error("{what} of {value} exceeds limit of {limit}")]
    LimitExceeded {
        /// What was being measured
        what: &'static str,
        /// Actual value
        value: u64,
        /// Largest accepted value
        limit: u64,
    },

    /// Output buffer smaller than the encoder guarantees it needs
    #[error("Buffer too small: need {needed} bytes, have {capacity}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes available
        capacity: usize,
    },

    /// Broken internal invariant
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl EvtarcError {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Truncated(_)
            | Self::VarIntOverlong { .. }
            | Self::VarIntOutOfRange { .. }
            | Self::UnknownVariantType(_)
            | Self::VariantTypeMismatch { .. }
            | Self::UnknownClass(_)
            | Self::InvalidWideStringLength(_)
            | Self::UnsupportedVersion(_)
            | Self::UnsupportedMode { .. }
            | Self::MissingDescriptor(_)
            | Self::InvalidFormat(_) => ErrorKind::Data,
            Self::LimitExceeded { .. } => ErrorKind::Limit,
            Self::BufferTooSmall { .. } | Self::Internal(_) => ErrorKind::Internal,
            Self::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Whether this error was caused by malformed input
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        self.kind() == ErrorKind::Data
    }

    /// Build a [`EvtarcError::LimitExceeded`] from any pair of integer-like values
    pub(crate) fn limit(what: &'static str, value: impl TryInto<u64>, limit: impl TryInto<u64>) -> Self {
        Self::LimitExceeded {
            what,
            value: value.try_into().unwrap_or(u64::MAX),
            limit: limit.try_into().unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(EvtarcError::Truncated("header").kind(), ErrorKind::Data);
        assert_eq!(EvtarcError::UnsupportedVersion(15).kind(), ErrorKind::Data);
        assert_eq!(EvtarcError::limit("string length", 10u64, 5u64).kind(), ErrorKind::Limit);
        assert_eq!(
            EvtarcError::BufferTooSmall {
                needed: 10,
                capacity: 2
            }
            .kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            EvtarcError::Io(io::Error::new(io::ErrorKind::Other, "disk")).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn test_error_display() {
        let err = EvtarcError::UnknownVariantType(0x0042);
        assert_eq!(err.to_string(), "Unknown variant type tag 0x0042");

        let err = EvtarcError::limit("array length", 9u32, 4u32);
        assert!(err.to_string().contains("array length of 9"));
    }
}
