//! Archive primitive codec
//!
//! Fixed-width little-endian fields, length-prefixed strings, GUIDs,
//! timestamps and class markers, plus the archive header.

mod format;
mod reader;
mod stamp;
mod writer;

pub use format::{
    ArchiveHeader, FormatVersion, CLASS_TAG_NAMED, CLASS_TAG_NONE, HEADER_SIZE, LIBRARY_CLASS,
};
pub use reader::ArchiveReader;
pub use stamp::{archive_epoch, stamp_from_days, stamp_to_days, MAX_ARCHIVE_DAYS};
pub use writer::ArchiveWriter;

use crate::Result;

/// Length word that switches an archive string to two bytes per character
pub const UNICODE_MARKER: u16 = 0xFFFE;

/// Bytes per character of an archive string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharWidth {
    /// One Latin-1 byte per character
    Narrow,
    /// One UTF-16LE code unit per character
    Wide,
}

/// Validate archive header modes and version
///
/// # Errors
///
/// Returns error if compression or encryption is requested, or the version
/// cannot be decoded
pub fn validate_header(header: &ArchiveHeader) -> Result<FormatVersion> {
    if header.compression_mode != 0 || header.encryption_mode != 0 {
        return Err(crate::EvtarcError::UnsupportedMode {
            compression: header.compression_mode,
            encryption: header.encryption_mode,
        });
    }

    let version = header.format_version();
    version.check_supported()?;
    Ok(version)
}
