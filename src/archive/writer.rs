//! Archive primitive writer

use std::io::Write;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::format::{ArchiveHeader, CLASS_TAG_NAMED, CLASS_TAG_NONE};
use super::stamp::stamp_to_days;
use super::UNICODE_MARKER;
use crate::{EvtarcError, Result};

/// Sequential writer for archive primitives
pub struct ArchiveWriter<W> {
    inner: W,
    position: u64,
}

macro_rules! write_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Write a little-endian `", stringify!($ty), "`")]
            ///
            /// # Errors
            ///
            /// Returns error if the sink fails
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                self.write_bytes(&value.to_le_bytes())
            }
        )*
    };
}

impl<W: Write> ArchiveWriter<W> {
    /// Create a writer over a byte sink
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes written so far
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Unwrap the underlying sink
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Flush the underlying sink
    ///
    /// # Errors
    ///
    /// Returns error if the sink fails
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Write raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the sink fails
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    write_le! {
        write_u8 => u8,
        write_i8 => i8,
        write_u16 => u16,
        write_i16 => i16,
        write_u32 => u32,
        write_i32 => i32,
        write_u64 => u64,
        write_f32 => f32,
        write_f64 => f64,
    }

    /// Write a 32-bit element count
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::LimitExceeded`] if `count` does not fit in a u32
    pub fn write_count(&mut self, what: &'static str, count: usize) -> Result<()> {
        let count = u32::try_from(count).map_err(|_| EvtarcError::limit(what, count, u32::MAX))?;
        self.write_u32(count)
    }

    /// Write the fixed archive header
    ///
    /// # Errors
    ///
    /// Returns error if the sink fails
    pub fn write_header(&mut self, header: &ArchiveHeader) -> Result<()> {
        self.write_bytes(&header.to_le_bytes())
    }

    /// Write the length prefix of an archive string.
    ///
    /// Lengths below 255 take one byte; otherwise a 0xFF sentinel is followed
    /// by a u16 (below 0xFFFE, which is reserved for the unicode marker), or
    /// a 0xFFFF sentinel and a u32, or a 0xFFFFFFFF sentinel and a u64.
    fn write_string_length(&mut self, len: u64) -> Result<()> {
        if len < 0xFF {
            return self.write_u8(len as u8);
        }
        self.write_u8(0xFF)?;

        if len < u64::from(UNICODE_MARKER) {
            return self.write_u16(len as u16);
        }
        self.write_u16(0xFFFF)?;

        if len < 0xFFFF_FFFF {
            return self.write_u32(len as u32);
        }
        self.write_u32(0xFFFF_FFFF)?;
        self.write_u64(len)
    }

    /// Write a length-prefixed archive string.
    ///
    /// Strings made only of Latin-1 characters are written one byte per
    /// character; anything else is written as UTF-16LE behind the unicode
    /// marker.
    ///
    /// # Errors
    ///
    /// Returns error if the sink fails
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        if value.chars().all(|c| u32::from(c) <= 0xFF) {
            let bytes: Vec<u8> = value.chars().map(|c| u32::from(c) as u8).collect();
            self.write_string_length(bytes.len() as u64)?;
            return self.write_bytes(&bytes);
        }

        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_u8(0xFF)?;
        self.write_u16(UNICODE_MARKER)?;
        self.write_string_length(units.len() as u64)?;
        self.write_utf16le(&units)
    }

    /// Write a wide string: a 32-bit byte length followed by UTF-16LE units
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::LimitExceeded`] if the byte length does not fit
    /// in an i32
    pub fn write_wide_string(&mut self, value: &str) -> Result<()> {
        let units: Vec<u16> = value.encode_utf16().collect();
        let byte_len = units.len() * 2;
        let byte_len = i32::try_from(byte_len)
            .map_err(|_| EvtarcError::limit("wide string byte length", byte_len, i32::MAX))?;
        self.write_i32(byte_len)?;
        self.write_utf16le(&units)
    }

    fn write_utf16le(&mut self, units: &[u16]) -> Result<()> {
        let bytes: Vec<u8> = units.iter().flat_map(|unit| unit.to_le_bytes()).collect();
        self.write_bytes(&bytes)
    }

    /// Write a GUID as u32, u16, u16 and eight raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the sink fails
    pub fn write_guid(&mut self, guid: &Uuid) -> Result<()> {
        let (d1, d2, d3, d4) = guid.as_fields();
        self.write_u32(d1)?;
        self.write_u16(d2)?;
        self.write_u16(d3)?;
        self.write_bytes(d4)
    }

    /// Write a timestamp as (days, day fraction)
    ///
    /// # Errors
    ///
    /// Returns a limit error for stamps past 9999-12-31, or any sink error
    pub fn write_timestamp(&mut self, stamp: NaiveDateTime) -> Result<()> {
        let (days, fraction) = stamp_to_days(stamp)?;
        self.write_f64(days)?;
        self.write_f64(fraction)
    }

    /// Write a class marker: tag 0 for `None`, tag -1 and the name otherwise
    ///
    /// # Errors
    ///
    /// Returns error if the sink fails
    pub fn write_class(&mut self, class_name: Option<&str>) -> Result<()> {
        match class_name {
            None => self.write_i32(CLASS_TAG_NONE),
            Some(name) => {
                self.write_i32(CLASS_TAG_NAMED)?;
                self.write_string(name)
            }
        }
    }
}
