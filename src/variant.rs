//! Self-describing variant values
//!
//! A variant is a 16-bit type tag followed by a typed payload. Arrays set the
//! `ARRAY` and `BYREF` bits on the tag, then carry a zero-valued scalar that
//! names the element type, a 32-bit count and the bare element payloads.
//!
//! Decoded values are kept as canonical text: integers in decimal, floats
//! rounded to `FLT_DIG` / `DBL_DIG` significant digits. Floating point
//! values therefore round-trip only up to that precision.

use std::fmt;
use std::io::{Read, Write};

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::{EvtarcError, Result};

/// Tag bit marking an array
pub const VT_ARRAY: u16 = 0x2000;

/// Tag bit marking a by-reference value, always set together with [`VT_ARRAY`]
pub const VT_BYREF: u16 = 0x4000;

const ARRAY_BITS: u16 = VT_ARRAY | VT_BYREF;

/// Significant digits kept for `float32` values
pub const FLOAT32_DIGITS: usize = 7;

/// Significant digits kept for `float64` values
pub const FLOAT64_DIGITS: usize = 15;

/// Scalar type of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum VariantType {
    /// No value
    Empty = 0,
    /// Explicit null
    Null = 1,
    /// Signed 16-bit integer
    Int16 = 2,
    /// Signed 32-bit integer
    Int32 = 3,
    /// 32-bit float
    Float32 = 4,
    /// 64-bit float
    Float64 = 5,
    /// Length-prefixed UTF-16 string
    WideString = 8,
    /// Boolean stored as int16 (-1 / 0)
    Bool = 11,
    /// Signed 8-bit integer
    Int8 = 16,
    /// Unsigned 8-bit integer
    UInt8 = 17,
    /// Unsigned 16-bit integer
    UInt16 = 18,
    /// Unsigned 32-bit integer
    UInt32 = 19,
}

impl VariantType {
    /// Look up a scalar type by its tag
    #[must_use]
    pub fn from_tag(tag: u16) -> Option<Self> {
        Some(match tag {
            0 => Self::Empty,
            1 => Self::Null,
            2 => Self::Int16,
            3 => Self::Int32,
            4 => Self::Float32,
            5 => Self::Float64,
            8 => Self::WideString,
            11 => Self::Bool,
            16 => Self::Int8,
            17 => Self::UInt8,
            18 => Self::UInt16,
            19 => Self::UInt32,
            _ => return None,
        })
    }

    /// Wire tag of this type
    #[must_use]
    pub fn tag(self) -> u16 {
        self as u16
    }

    /// Whether values of this type carry a payload
    #[must_use]
    pub fn has_payload(self) -> bool {
        !matches!(self, Self::Empty | Self::Null)
    }

    /// Text of the zero value, used for array element descriptors
    fn zero_text(self) -> &'static str {
        match self {
            Self::WideString => "",
            _ => "0",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Null => "null",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::WideString => "wide string",
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust types that can be stored in a variant
pub trait VariantValue: Sized {
    /// Variant type used for this Rust type
    const TYPE: VariantType;

    /// Canonical text form
    fn to_text(&self) -> String;

    /// Parse the canonical text form
    fn from_text(text: &str) -> Option<Self>;
}

macro_rules! impl_integer_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl VariantValue for $ty {
                const TYPE: VariantType = VariantType::$variant;

                fn to_text(&self) -> String {
                    self.to_string()
                }

                fn from_text(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )*
    };
}

impl_integer_value! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
}

impl VariantValue for f32 {
    const TYPE: VariantType = VariantType::Float32;

    fn to_text(&self) -> String {
        let rounded = format!("{:.*e}", FLOAT32_DIGITS - 1, self);
        rounded.parse::<f32>().unwrap_or(*self).to_string()
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl VariantValue for f64 {
    const TYPE: VariantType = VariantType::Float64;

    fn to_text(&self) -> String {
        let rounded = format!("{:.*e}", FLOAT64_DIGITS - 1, self);
        rounded.parse::<f64>().unwrap_or(*self).to_string()
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl VariantValue for bool {
    const TYPE: VariantType = VariantType::Bool;

    fn to_text(&self) -> String {
        let text = if *self { "1" } else { "0" };
        text.to_string()
    }

    fn from_text(text: &str) -> Option<Self> {
        match text.trim() {
            "true" => Some(true),
            "false" => Some(false),
            other => other.parse::<i64>().ok().map(|v| v != 0),
        }
    }
}

impl VariantValue for String {
    const TYPE: VariantType = VariantType::WideString;

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

/// A tagged scalar or homogeneous array value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Element type
    pub value_type: VariantType,
    /// Whether this is an array
    pub is_array: bool,
    /// Canonical text of each value; exactly one for scalars with a payload
    pub values: Vec<String>,
}

impl Default for Variant {
    fn default() -> Self {
        Self::empty()
    }
}

impl Variant {
    /// An empty variant
    #[must_use]
    pub fn empty() -> Self {
        Self {
            value_type: VariantType::Empty,
            is_array: false,
            values: Vec::new(),
        }
    }

    /// A null variant
    #[must_use]
    pub fn null() -> Self {
        Self {
            value_type: VariantType::Null,
            ..Self::empty()
        }
    }

    /// A scalar variant
    pub fn scalar<T: VariantValue>(value: T) -> Self {
        Self {
            value_type: T::TYPE,
            is_array: false,
            values: vec![value.to_text()],
        }
    }

    /// An array variant
    pub fn array<T: VariantValue>(values: &[T]) -> Self {
        Self {
            value_type: T::TYPE,
            is_array: true,
            values: values.iter().map(VariantValue::to_text).collect(),
        }
    }

    /// Human-readable shape, e.g. `float32 array`
    #[must_use]
    pub fn shape(&self) -> String {
        if self.is_array {
            format!("{} array", self.value_type)
        } else {
            self.value_type.to_string()
        }
    }

    fn mismatch<T: VariantValue>(&self, array: bool) -> EvtarcError {
        let expected = if array {
            format!("{} array", T::TYPE)
        } else {
            T::TYPE.to_string()
        };
        EvtarcError::VariantTypeMismatch {
            expected,
            found: self.shape(),
        }
    }

    /// Typed scalar value
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::VariantTypeMismatch`] if this is not a scalar
    /// of type `T`
    pub fn get<T: VariantValue>(&self) -> Result<T> {
        if self.value_type != T::TYPE || self.is_array {
            return Err(self.mismatch::<T>(false));
        }
        match self.values.as_slice() {
            [text] => T::from_text(text).ok_or_else(|| self.mismatch::<T>(false)),
            _ => Err(self.mismatch::<T>(false)),
        }
    }

    /// Typed array values
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::VariantTypeMismatch`] if this is not an array
    /// of type `T`
    pub fn get_array<T: VariantValue>(&self) -> Result<Vec<T>> {
        if self.value_type != T::TYPE || !self.is_array {
            return Err(self.mismatch::<T>(true));
        }
        self.values
            .iter()
            .map(|text| T::from_text(text).ok_or_else(|| self.mismatch::<T>(true)))
            .collect()
    }

    /// Decode a variant
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::UnknownVariantType`] for unknown tags, or any
    /// error from the underlying reader
    pub fn load<R: Read>(reader: &mut ArchiveReader<R>) -> Result<Self> {
        let tag = reader.read_u16()?;
        if let Some(value_type) = VariantType::from_tag(tag) {
            let values = read_payload(reader, value_type)?.into_iter().collect();
            return Ok(Self {
                value_type,
                is_array: false,
                values,
            });
        }

        if tag & ARRAY_BITS != ARRAY_BITS {
            return Err(EvtarcError::UnknownVariantType(tag));
        }
        let value_type =
            VariantType::from_tag(tag & !ARRAY_BITS).ok_or(EvtarcError::UnknownVariantType(tag))?;
        Self::load_array(reader, value_type)
    }

    fn load_array<R: Read>(reader: &mut ArchiveReader<R>, value_type: VariantType) -> Result<Self> {
        if !value_type.has_payload() {
            return Err(EvtarcError::InvalidFormat(format!(
                "variant array of {value_type}"
            )));
        }

        // Element type descriptor: a scalar of the element type with a zero payload
        let descriptor_tag = reader.read_u16()?;
        let descriptor_type = VariantType::from_tag(descriptor_tag)
            .ok_or(EvtarcError::UnknownVariantType(descriptor_tag))?;
        if descriptor_type != value_type {
            return Err(EvtarcError::InvalidFormat(format!(
                "array of {value_type} described as {descriptor_type}"
            )));
        }
        read_payload(reader, descriptor_type)?;

        let limit = reader.limits().max_array_len;
        let count = reader.read_count("variant array length", limit)?;
        let mut values = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            if let Some(text) = read_payload(reader, value_type)? {
                values.push(text);
            }
        }

        Ok(Self {
            value_type,
            is_array: true,
            values,
        })
    }

    /// Encode this variant
    ///
    /// # Errors
    ///
    /// Returns an internal error if the variant breaks its own invariants
    /// (a scalar without exactly one value, an array of empty, or text that
    /// does not parse as the declared type)
    pub fn store<W: Write>(&self, writer: &mut ArchiveWriter<W>) -> Result<()> {
        let value_type = self.value_type;

        if self.is_array {
            if !value_type.has_payload() {
                return Err(EvtarcError::Internal(format!(
                    "cannot write a variant array of {value_type}"
                )));
            }
            writer.write_u16(value_type.tag() | ARRAY_BITS)?;
            writer.write_u16(value_type.tag())?;
            write_payload(writer, value_type, value_type.zero_text())?;
            writer.write_count("variant array length", self.values.len())?;
            for text in &self.values {
                write_payload(writer, value_type, text)?;
            }
            return Ok(());
        }

        writer.write_u16(value_type.tag())?;
        if !value_type.has_payload() {
            return Ok(());
        }
        match self.values.as_slice() {
            [text] => write_payload(writer, value_type, text),
            values => Err(EvtarcError::Internal(format!(
                "simple {value_type} variant holds {} values",
                values.len()
            ))),
        }
    }
}

fn read_payload<R: Read>(
    reader: &mut ArchiveReader<R>,
    value_type: VariantType,
) -> Result<Option<String>> {
    let text = match value_type {
        VariantType::Empty | VariantType::Null => return Ok(None),
        VariantType::Int8 => reader.read_i8()?.to_text(),
        VariantType::Int16 => reader.read_i16()?.to_text(),
        VariantType::Int32 => reader.read_i32()?.to_text(),
        VariantType::UInt8 => reader.read_u8()?.to_text(),
        VariantType::UInt16 => reader.read_u16()?.to_text(),
        VariantType::UInt32 => reader.read_u32()?.to_text(),
        VariantType::Float32 => reader.read_f32()?.to_text(),
        VariantType::Float64 => reader.read_f64()?.to_text(),
        VariantType::Bool => (reader.read_i16()? != 0).to_text(),
        VariantType::WideString => reader.read_wide_string()?,
    };
    Ok(Some(text))
}

fn parse_payload<T: VariantValue>(text: &str) -> Result<T> {
    T::from_text(text).ok_or_else(|| {
        EvtarcError::Internal(format!("{text:?} is not a valid {} value", T::TYPE))
    })
}

fn write_payload<W: Write>(
    writer: &mut ArchiveWriter<W>,
    value_type: VariantType,
    text: &str,
) -> Result<()> {
    match value_type {
        VariantType::Empty | VariantType::Null => Ok(()),
        VariantType::Int8 => writer.write_i8(parse_payload(text)?),
        VariantType::Int16 => writer.write_i16(parse_payload(text)?),
        VariantType::Int32 => writer.write_i32(parse_payload(text)?),
        VariantType::UInt8 => writer.write_u8(parse_payload(text)?),
        VariantType::UInt16 => writer.write_u16(parse_payload(text)?),
        VariantType::UInt32 => writer.write_u32(parse_payload(text)?),
        VariantType::Float32 => writer.write_f32(parse_payload(text)?),
        VariantType::Float64 => writer.write_f64(parse_payload(text)?),
        VariantType::Bool => {
            let value: bool = parse_payload(text)?;
            writer.write_i16(if value { -1 } else { 0 })
        }
        VariantType::WideString => writer.write_wide_string(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeLimits;
    use crate::ErrorKind;
    use std::io::Cursor;

    fn encode(variant: &Variant) -> Vec<u8> {
        let mut writer = ArchiveWriter::new(Vec::new());
        variant.store(&mut writer).unwrap();
        writer.into_inner()
    }

    fn decode(bytes: Vec<u8>) -> Result<Variant> {
        Variant::load(&mut ArchiveReader::new(Cursor::new(bytes)))
    }

    #[test]
    fn test_scalar_layout() {
        assert_eq!(encode(&Variant::scalar(7i32)), vec![3, 0, 7, 0, 0, 0]);
        assert_eq!(encode(&Variant::scalar(true)), vec![11, 0, 0xFF, 0xFF]);
        assert_eq!(encode(&Variant::empty()), vec![0, 0]);
        assert_eq!(encode(&Variant::null()), vec![1, 0]);
    }

    #[test]
    fn test_array_layout() {
        let bytes = encode(&Variant::array(&[1.0f32, 2.0]));

        let mut expected = Vec::new();
        expected.extend_from_slice(&(4u16 | VT_ARRAY | VT_BYREF).to_le_bytes());
        expected.extend_from_slice(&4u16.to_le_bytes());
        expected.extend_from_slice(&0.0f32.to_le_bytes());
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&2.0f32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_roundtrip_each_type() {
        let variants = [
            Variant::scalar(-5i8),
            Variant::scalar(-300i16),
            Variant::scalar(70_000i32),
            Variant::scalar(200u8),
            Variant::scalar(60_000u16),
            Variant::scalar(4_000_000_000u32),
            Variant::scalar(0.25f32),
            Variant::scalar(-1.5e-3f64),
            Variant::scalar(false),
            Variant::scalar("Left eye open".to_string()),
            Variant::array(&["a".to_string(), "bc".to_string()]),
            Variant::array(&[1i16, -1, 3]),
            Variant::array::<f64>(&[]),
            Variant::empty(),
            Variant::null(),
        ];

        for variant in variants {
            assert_eq!(decode(encode(&variant)).unwrap(), variant);
        }
    }

    #[test]
    fn test_typed_access() {
        let variant = Variant::array(&[1.0f32, 2.5]);
        assert_eq!(variant.get_array::<f32>().unwrap(), vec![1.0, 2.5]);

        let err = variant.get::<f32>().unwrap_err();
        assert!(matches!(err, EvtarcError::VariantTypeMismatch { .. }));
        assert!(err.is_data_error());

        let err = variant.get_array::<i32>().unwrap_err();
        assert!(err.to_string().contains("int32 array"));

        assert_eq!(Variant::scalar(42i32).get::<i32>().unwrap(), 42);
    }

    #[test]
    fn test_float_text_precision() {
        assert_eq!(Variant::scalar(0.1f64).values, vec!["0.1"]);
        assert_eq!(Variant::scalar(1.0f32).values, vec!["1"]);
        assert_eq!(Variant::scalar(1.0f64 / 3.0).values, vec!["0.333333333333333"]);
        assert_eq!(Variant::scalar(1.0f32 / 3.0).values, vec!["0.3333333"]);

        // Precision beyond DBL_DIG is lost on the way through text
        let third = Variant::scalar(1.0f64 / 3.0).get::<f64>().unwrap();
        assert_ne!(third, 1.0 / 3.0);
        assert!((third - 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn test_unknown_tag() {
        let err = decode(vec![0x42, 0x00]).unwrap_err();
        assert!(matches!(err, EvtarcError::UnknownVariantType(0x0042)));
    }

    #[test]
    fn test_array_requires_both_bits() {
        let tag = 3u16 | VT_ARRAY;
        let err = decode(tag.to_le_bytes().to_vec()).unwrap_err();
        assert!(matches!(err, EvtarcError::UnknownVariantType(t) if t == tag));
    }

    #[test]
    fn test_array_descriptor_mismatch() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(3u16 | VT_ARRAY | VT_BYREF).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&0i16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(decode(bytes).unwrap_err().is_data_error());
    }

    #[test]
    fn test_array_length_limit() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(3u16 | VT_ARRAY | VT_BYREF).to_le_bytes());
        bytes.extend_from_slice(&3u16.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());

        let limits = DecodeLimits {
            max_array_len: 16,
            ..DecodeLimits::default()
        };
        let mut reader = ArchiveReader::with_limits(Cursor::new(bytes), limits);
        let err = Variant::load(&mut reader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
    }

    #[test]
    fn test_multi_valued_scalar_is_internal() {
        let variant = Variant {
            value_type: VariantType::Int32,
            is_array: false,
            values: vec!["1".to_string(), "2".to_string()],
        };
        let mut writer = ArchiveWriter::new(Vec::new());
        let err = variant.store(&mut writer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_unparsable_text_is_internal() {
        let variant = Variant {
            value_type: VariantType::UInt8,
            is_array: false,
            values: vec!["300".to_string()],
        };
        let mut writer = ArchiveWriter::new(Vec::new());
        assert_eq!(variant.store(&mut writer).unwrap_err().kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_empty_array_is_internal() {
        let variant = Variant {
            value_type: VariantType::Null,
            is_array: true,
            values: vec![],
        };
        let mut writer = ArchiveWriter::new(Vec::new());
        assert_eq!(variant.store(&mut writer).unwrap_err().kind(), ErrorKind::Internal);
    }
}
