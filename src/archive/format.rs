//! Binary format structures

use bytemuck::{Pod, Zeroable};

use crate::{EvtarcError, Result};

/// Archive header size (six 32-bit fields)
pub const HEADER_SIZE: usize = 24;

/// Class marker tag for "no object follows"
pub const CLASS_TAG_NONE: i32 = 0;

/// Class marker tag for "named class follows"
pub const CLASS_TAG_NAMED: i32 = -1;

/// Class name wrapping the whole event library
pub const LIBRARY_CLASS: &str = "class dcEventsLibrary_c";

/// Archive format version.
///
/// Every record layout is a pure function of this value; it is read once
/// from the header and passed unchanged to every record codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion(i32);

impl FormatVersion {
    /// Version written by this codec
    pub const CURRENT: Self = Self(174);

    /// First version carrying event descriptors
    pub const DESCRIPTORS: i32 = 19;

    /// First version of the unreadable gap before descriptors
    pub const UNSUPPORTED_FROM: i32 = 11;

    /// Versions below this pad epoch records with a dummy int32
    pub const EPOCH_PADDING_BEFORE: i32 = 33;

    /// First version carrying a user-visible event name
    pub const USER_VISIBLE_NAME: i32 = 78;

    /// Last version storing the marker amplitude flag as int8
    pub const NARROW_SHOW_AMPLITUDE_UNTIL: i32 = 103;

    /// First version carrying an artefact description
    pub const ARTEFACT_DESCRIPTION: i32 = 174;

    /// Wrap a raw version number
    #[must_use]
    pub const fn new(version: i32) -> Self {
        Self(version)
    }

    /// Raw version number
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Check that records of this version can be read and written
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::UnsupportedVersion`] for negative versions, the
    /// `[11, 19)` range, and versions newer than [`FormatVersion::CURRENT`]
    pub fn check_supported(self) -> Result<()> {
        let unsupported_gap = (Self::UNSUPPORTED_FROM..Self::DESCRIPTORS).contains(&self.0);
        if self.0 < 0 || unsupported_gap || self > Self::CURRENT {
            return Err(EvtarcError::UnsupportedVersion(self.0));
        }
        Ok(())
    }

    /// Event headers end with a descriptor list
    #[must_use]
    pub const fn has_descriptors(self) -> bool {
        self.0 >= Self::DESCRIPTORS
    }

    /// Event headers carry a user-visible name after the name
    #[must_use]
    pub const fn has_user_visible_name(self) -> bool {
        self.0 >= Self::USER_VISIBLE_NAME
    }

    /// Epoch records carry a dummy int32
    #[must_use]
    pub const fn has_epoch_padding(self) -> bool {
        self.0 < Self::EPOCH_PADDING_BEFORE
    }

    /// Marker `show_amplitude` is an int32 instead of an int8
    #[must_use]
    pub const fn has_wide_show_amplitude(self) -> bool {
        self.0 > Self::NARROW_SHOW_AMPLITUDE_UNTIL
    }

    /// Artefact records carry a description
    #[must_use]
    pub const fn has_artefact_description(self) -> bool {
        self.0 >= Self::ARTEFACT_DESCRIPTION
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Archive header (24 bytes, little-endian on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ArchiveHeader {
    /// Legacy creation time, ignored on read
    pub ctime: u32,

    /// Legacy modification time, ignored on read
    pub mtime: u32,

    /// Legacy access time, ignored on read
    pub atime: u32,

    /// Format version of every record in the archive
    pub version: i32,

    /// Compression mode (only 0 is supported)
    pub compression_mode: i32,

    /// Encryption mode (only 0 is supported)
    pub encryption_mode: i32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<ArchiveHeader>(), HEADER_SIZE);

impl ArchiveHeader {
    /// Create a plain header for the given version
    #[must_use]
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version: version.get(),
            ..Self::zeroed()
        }
    }

    /// Decode a header from its on-disk bytes
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let raw: Self = bytemuck::pod_read_unaligned(bytes);
        Self {
            ctime: u32::from_le(raw.ctime),
            mtime: u32::from_le(raw.mtime),
            atime: u32::from_le(raw.atime),
            version: i32::from_le(raw.version),
            compression_mode: i32::from_le(raw.compression_mode),
            encryption_mode: i32::from_le(raw.encryption_mode),
        }
    }

    /// Encode this header to its on-disk bytes
    #[must_use]
    pub fn to_le_bytes(&self) -> [u8; HEADER_SIZE] {
        let le = Self {
            ctime: self.ctime.to_le(),
            mtime: self.mtime.to_le(),
            atime: self.atime.to_le(),
            version: self.version.to_le(),
            compression_mode: self.compression_mode.to_le(),
            encryption_mode: self.encryption_mode.to_le(),
        };
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(bytemuck::bytes_of(&le));
        out
    }

    /// Format version stored in this header
    #[must_use]
    pub fn format_version(&self) -> FormatVersion {
        FormatVersion::new(self.version)
    }
}
