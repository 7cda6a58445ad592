//! Archive primitive reader

use std::io::{self, Read};

use chrono::NaiveDateTime;
use tracing::trace;
use uuid::Uuid;

use super::format::{ArchiveHeader, CLASS_TAG_NAMED, CLASS_TAG_NONE, HEADER_SIZE};
use super::stamp::stamp_from_days;
use super::{CharWidth, UNICODE_MARKER};
use crate::config::DecodeLimits;
use crate::{EvtarcError, Result};

const READ_CHUNK: usize = 64 * 1024;

/// Sequential reader for archive primitives.
///
/// Wraps any byte source. All multi-byte fields are little-endian. A short
/// read is reported as [`EvtarcError::Truncated`], every other stream
/// failure as [`EvtarcError::Io`].
pub struct ArchiveReader<R> {
    inner: R,
    limits: DecodeLimits,
    position: u64,
}

macro_rules! read_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Read a little-endian `", stringify!($ty), "`")]
            ///
            /// # Errors
            ///
            /// Returns error if the source is exhausted or fails
            pub fn $name(&mut self) -> Result<$ty> {
                let bytes = self.read_array(stringify!($ty))?;
                Ok(<$ty>::from_le_bytes(bytes))
            }
        )*
    };
}

impl<R: Read> ArchiveReader<R> {
    /// Create a reader with default decode limits
    pub fn new(inner: R) -> Self {
        Self::with_limits(inner, DecodeLimits::default())
    }

    /// Create a reader with explicit decode limits
    pub fn with_limits(inner: R, limits: DecodeLimits) -> Self {
        Self {
            inner,
            limits,
            position: 0,
        }
    }

    /// Decode limits in effect
    #[must_use]
    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Bytes consumed so far
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Unwrap the underlying source
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fill `buf` completely
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::Truncated`] naming `what` if the source ends early
    pub fn read_exact(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                EvtarcError::Truncated(what)
            } else {
                EvtarcError::Io(e)
            }
        })?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf, what)?;
        Ok(buf)
    }

    /// Read `len` bytes, growing the buffer as data arrives so a bogus
    /// length cannot force a huge allocation up front
    fn read_vec(&mut self, len: usize, what: &'static str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(READ_CHUNK));
        let wanted = u64::try_from(len).map_err(|_| EvtarcError::limit(what, len, u64::MAX))?;
        (&mut self.inner).take(wanted).read_to_end(&mut buf)?;
        self.position += buf.len() as u64;
        if buf.len() != len {
            return Err(EvtarcError::Truncated(what));
        }
        Ok(buf)
    }

    read_le! {
        read_u8 => u8,
        read_i8 => i8,
        read_u16 => u16,
        read_i16 => i16,
        read_u32 => u32,
        read_i32 => i32,
        read_u64 => u64,
        read_f32 => f32,
        read_f64 => f64,
    }

    /// Read a 32-bit element count and check it against `limit`
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::LimitExceeded`] if the count is above `limit`
    pub fn read_count(&mut self, what: &'static str, limit: usize) -> Result<usize> {
        let count = self.read_u32()?;
        let count = usize::try_from(count).map_err(|_| EvtarcError::limit(what, count, usize::MAX))?;
        if count > limit {
            return Err(EvtarcError::limit(what, count, limit));
        }
        Ok(count)
    }

    /// Read the fixed archive header
    ///
    /// # Errors
    ///
    /// Returns error if fewer than 24 bytes remain
    pub fn read_header(&mut self) -> Result<ArchiveHeader> {
        let bytes: [u8; HEADER_SIZE] = self.read_array("archive header")?;
        Ok(ArchiveHeader::from_le_bytes(&bytes))
    }

    /// Read the length prefix of an archive string.
    /// Returns the length in characters and the character width.
    fn read_string_length(&mut self) -> Result<(u64, CharWidth)> {
        let mut width = CharWidth::Narrow;
        loop {
            let byte = self.read_u8()?;
            if byte < 0xFF {
                return Ok((u64::from(byte), width));
            }

            let word = self.read_u16()?;
            if word == UNICODE_MARKER {
                if width == CharWidth::Wide {
                    return Err(EvtarcError::InvalidFormat(
                        "repeated unicode marker in string length".to_string(),
                    ));
                }
                width = CharWidth::Wide;
                continue;
            }
            if word < 0xFFFF {
                return Ok((u64::from(word), width));
            }

            let dword = self.read_u32()?;
            if dword < 0xFFFF_FFFF {
                return Ok((u64::from(dword), width));
            }

            return Ok((self.read_u64()?, width));
        }
    }

    /// Read a length-prefixed archive string.
    ///
    /// Narrow strings hold one Latin-1 byte per character, strings behind the
    /// unicode marker hold UTF-16LE code units.
    ///
    /// # Errors
    ///
    /// Returns error if the data is truncated, malformed, or longer than the
    /// configured string limit
    pub fn read_string(&mut self) -> Result<String> {
        let (len, width) = self.read_string_length()?;
        let limit = self.limits.max_string_len;
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= limit)
            .ok_or_else(|| EvtarcError::limit("string length", len, limit))?;

        match width {
            CharWidth::Narrow => {
                let bytes = self.read_vec(len, "string")?;
                Ok(bytes.into_iter().map(char::from).collect())
            }
            CharWidth::Wide => {
                let byte_len = len
                    .checked_mul(2)
                    .ok_or_else(|| EvtarcError::limit("unicode string length", len, usize::MAX / 2))?;
                let bytes = self.read_vec(byte_len, "unicode string")?;
                Ok(decode_utf16le(&bytes))
            }
        }
    }

    /// Read a wide string: a 32-bit byte length followed by UTF-16LE units
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::InvalidWideStringLength`] for negative or odd
    /// lengths, or a limit error for strings above the configured limit
    pub fn read_wide_string(&mut self) -> Result<String> {
        let byte_len = self.read_i32()?;
        if byte_len < 0 || byte_len % 2 != 0 {
            return Err(EvtarcError::InvalidWideStringLength(i64::from(byte_len)));
        }

        let units = usize::try_from(byte_len / 2)
            .map_err(|_| EvtarcError::InvalidWideStringLength(i64::from(byte_len)))?;
        if units > self.limits.max_string_len {
            return Err(EvtarcError::limit(
                "wide string length",
                units,
                self.limits.max_string_len,
            ));
        }

        let bytes = self.read_vec(units * 2, "wide string")?;
        Ok(decode_utf16le(&bytes))
    }

    /// Read a GUID stored as u32, u16, u16 and eight raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the data is truncated
    pub fn read_guid(&mut self) -> Result<Uuid> {
        let d1 = self.read_u32()?;
        let d2 = self.read_u16()?;
        let d3 = self.read_u16()?;
        let d4: [u8; 8] = self.read_array("guid")?;
        Ok(Uuid::from_fields(d1, d2, d3, &d4))
    }

    /// Read a timestamp stored as (days, day fraction)
    ///
    /// # Errors
    ///
    /// Returns error if the data is truncated or not a representable date
    pub fn read_timestamp(&mut self) -> Result<NaiveDateTime> {
        let days = self.read_f64()?;
        let fraction = self.read_f64()?;
        stamp_from_days(days, fraction)
    }

    /// Read a class marker: `None` for tag 0, the class name for tag -1
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::InvalidFormat`] for any other tag
    pub fn read_class(&mut self) -> Result<Option<String>> {
        match self.read_i32()? {
            CLASS_TAG_NONE => Ok(None),
            CLASS_TAG_NAMED => {
                let name = self.read_string()?;
                trace!("Class marker {:?} at offset {}", name, self.position);
                Ok(Some(name))
            }
            tag => Err(EvtarcError::InvalidFormat(format!(
                "invalid class tag {tag} at offset {}",
                self.position - 4
            ))),
        }
    }
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
