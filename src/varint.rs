//! Variable-length integer encoding (LEB128)
//!
//! Each byte carries 7 bits of payload and a continuation flag in the MSB.
//! Unsigned values stop once the remaining value is zero; signed values stop
//! once the remaining value is pure sign extension of the last group, so the
//! output is always the shortest form. Both directions work for any integer
//! width up to 64 bits through the [`VarInt`] trait.

use std::io::{self, Read, Write};

use crate::{EvtarcError, Result};

/// Maximum bytes for a 64-bit varint (ceil(64/7) = 10)
pub const MAX_VARINT_BYTES: usize = 10;

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7F;
const SIGN: u8 = 0x40;

/// Integer types with a LEB128 representation
pub trait VarInt: Copy + Sized {
    /// Width of the integer in bits
    const BITS: u32;

    /// Longest valid encoding, `ceil(BITS / 7)`
    const MAX_BYTES: usize = (Self::BITS as usize + 6) / 7;

    /// Encode into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`EvtarcError::BufferTooSmall`] if `buf` cannot hold the
    /// encoding. A buffer of [`VarInt::MAX_BYTES`] is always large enough.
    fn encode(self, buf: &mut [u8]) -> Result<usize>;

    /// Decode from the front of `buf`, returning the value and bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns a data error if the input ends while a continuation bit is
    /// set, runs past [`VarInt::MAX_BYTES`], or does not fit the width.
    fn decode(buf: &[u8]) -> Result<(Self, usize)>;

    /// Number of bytes [`VarInt::encode`] will produce
    fn encoded_len(self) -> usize;
}

fn push(buf: &mut [u8], index: usize, byte: u8, needed: usize) -> Result<()> {
    match buf.get_mut(index) {
        Some(slot) => {
            *slot = byte;
            Ok(())
        }
        None => Err(EvtarcError::BufferTooSmall {
            needed,
            capacity: buf.len(),
        }),
    }
}

fn encode_unsigned(mut value: u64, buf: &mut [u8]) -> Result<usize> {
    let needed = unsigned_len(value);
    let mut i = 0;
    loop {
        let mut byte = (value as u8) & PAYLOAD;
        value >>= 7;
        if value != 0 {
            byte |= CONTINUATION;
        }
        push(buf, i, byte, needed)?;
        i += 1;
        if value == 0 {
            return Ok(i);
        }
    }
}

fn encode_signed(mut value: i64, buf: &mut [u8]) -> Result<usize> {
    let needed = signed_len(value);
    let mut i = 0;
    loop {
        let mut byte = (value as u8) & PAYLOAD;
        value >>= 7;
        let done = (value == 0 && byte & SIGN == 0) || (value == -1 && byte & SIGN != 0);
        if !done {
            byte |= CONTINUATION;
        }
        push(buf, i, byte, needed)?;
        i += 1;
        if done {
            return Ok(i);
        }
    }
}

const fn unsigned_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    (bits + 6) / 7
}

const fn signed_len(value: i64) -> usize {
    // Significant bits plus one sign bit
    let magnitude = if value < 0 { !value } else { value };
    let bits = 64 - magnitude.leading_zeros() as usize + 1;
    (bits + 6) / 7
}

/// Collect 7-bit groups until a byte without the continuation flag.
/// Returns the raw accumulator, the shift after the last group, the last
/// byte and the number of bytes consumed.
fn collect_groups(buf: &[u8], bits: u32, max_bytes: usize) -> Result<(u128, u32, u8, usize)> {
    let mut result: u128 = 0;
    let mut shift = 0u32;

    for (i, &byte) in buf.iter().enumerate() {
        if i >= max_bytes {
            return Err(EvtarcError::VarIntOverlong { bits, max_bytes });
        }

        result |= u128::from(byte & PAYLOAD) << shift;
        shift += 7;

        if byte & CONTINUATION == 0 {
            return Ok((result, shift, byte, i + 1));
        }
    }

    if buf.len() >= max_bytes {
        return Err(EvtarcError::VarIntOverlong { bits, max_bytes });
    }
    Err(EvtarcError::Truncated("varint"))
}

fn decode_unsigned(buf: &[u8], bits: u32, max_bytes: usize) -> Result<(u64, usize)> {
    let (raw, _, _, len) = collect_groups(buf, bits, max_bytes)?;
    if raw >> bits != 0 {
        return Err(EvtarcError::VarIntOutOfRange { bits });
    }
    u64::try_from(raw)
        .map(|value| (value, len))
        .map_err(|_| EvtarcError::VarIntOutOfRange { bits })
}

fn decode_signed(buf: &[u8], bits: u32, max_bytes: usize) -> Result<(i64, usize)> {
    let (raw, shift, last, len) = collect_groups(buf, bits, max_bytes)?;
    let mut value = raw as i128;
    if last & SIGN != 0 && shift < 128 {
        value |= -1i128 << shift;
    }

    let min = -(1i128 << (bits - 1));
    let max = (1i128 << (bits - 1)) - 1;
    if value < min || value > max {
        return Err(EvtarcError::VarIntOutOfRange { bits });
    }
    i64::try_from(value)
        .map(|value| (value, len))
        .map_err(|_| EvtarcError::VarIntOutOfRange { bits })
}

macro_rules! impl_unsigned_varint {
    ($($ty:ty),*) => {
        $(
            impl VarInt for $ty {
                const BITS: u32 = <$ty>::BITS;

                fn encode(self, buf: &mut [u8]) -> Result<usize> {
                    encode_unsigned(u64::from(self), buf)
                }

                fn decode(buf: &[u8]) -> Result<(Self, usize)> {
                    let (value, len) = decode_unsigned(buf, Self::BITS, Self::MAX_BYTES)?;
                    let value = <$ty>::try_from(value)
                        .map_err(|_| EvtarcError::VarIntOutOfRange { bits: Self::BITS })?;
                    Ok((value, len))
                }

                fn encoded_len(self) -> usize {
                    unsigned_len(u64::from(self))
                }
            }
        )*
    };
}

macro_rules! impl_signed_varint {
    ($($ty:ty),*) => {
        $(
            impl VarInt for $ty {
                const BITS: u32 = <$ty>::BITS;

                fn encode(self, buf: &mut [u8]) -> Result<usize> {
                    encode_signed(i64::from(self), buf)
                }

                fn decode(buf: &[u8]) -> Result<(Self, usize)> {
                    let (value, len) = decode_signed(buf, Self::BITS, Self::MAX_BYTES)?;
                    let value = <$ty>::try_from(value)
                        .map_err(|_| EvtarcError::VarIntOutOfRange { bits: Self::BITS })?;
                    Ok((value, len))
                }

                fn encoded_len(self) -> usize {
                    signed_len(i64::from(self))
                }
            }
        )*
    };
}

impl_unsigned_varint!(u8, u16, u32, u64);
impl_signed_varint!(i8, i16, i32, i64);

/// Encode a value and write it to a writer.
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns error if the writer fails
pub fn write_varint<T: VarInt, W: Write>(value: T, writer: &mut W) -> Result<usize> {
    let mut buf = [0u8; MAX_VARINT_BYTES];
    let len = value.encode(&mut buf)?;
    writer.write_all(&buf[..len])?;
    Ok(len)
}

/// Decode a value from a reader, one byte at a time.
/// Returns the value and the number of bytes consumed.
///
/// # Errors
///
/// Returns a data error for truncated or invalid encodings, or the reader's
/// own error for any other I/O failure
pub fn read_varint<T: VarInt, R: Read>(reader: &mut R) -> Result<(T, usize)> {
    let mut buf = [0u8; MAX_VARINT_BYTES];
    let mut len = 0;

    loop {
        if len >= T::MAX_BYTES {
            return Err(EvtarcError::VarIntOverlong {
                bits: T::BITS,
                max_bytes: T::MAX_BYTES,
            });
        }

        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                EvtarcError::Truncated("varint")
            } else {
                EvtarcError::Io(e)
            }
        })?;

        buf[len] = byte[0];
        len += 1;

        if byte[0] & CONTINUATION == 0 {
            return T::decode(&buf[..len]);
        }
    }
}
