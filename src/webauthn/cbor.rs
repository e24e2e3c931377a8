//! # CBOR Decoder
//!
//! Authenticators encode their public keys (and attestation objects) in CBOR,
//! a self-describing binary format. We only need the subset they actually
//! emit: integers, byte strings, text strings, arrays and maps with
//! definite lengths.
//!
//! ## Item header
//! Each item starts with one byte:
//! - top 3 bits: the major type (0 = unsigned, 1 = negative, 2 = bytes,
//!   3 = text, 4 = array, 5 = map)
//! - low 5 bits: either the value itself (< 24) or how many following bytes
//!   hold it (24 = 1 byte, 25 = 2 bytes, 26 = 4 bytes, big-endian)
//!
//! Anything else (floats, tags, simple values, 8-byte arguments,
//! indefinite lengths) is rejected. The input comes straight from the
//! client, so an encoding we don't understand is an error, not a gap.

use crate::webauthn::reader::{ByteReader, OutOfBounds};
use thiserror::Error;

/// Deepest array/map nesting accepted before giving up
const MAX_DEPTH: usize = 16;

/// A decoded CBOR item
///
/// Map entries keep their wire order; lookups are linear, which is fine for
/// the handful of entries in a COSE key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unsigned(u64),
    Negative(i64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Integer value of an `Unsigned` or `Negative` item
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Unsigned(n) => i64::try_from(*n).ok(),
            Value::Negative(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CborError {
    #[error("truncated item: {0}")]
    Truncated(#[from] OutOfBounds),

    #[error("unsupported major type {0}")]
    UnsupportedMajorType(u8),

    #[error("unsupported additional info {additional} for major type {major}")]
    UnsupportedEncoding { major: u8, additional: u8 },

    #[error("text string is not valid UTF-8")]
    InvalidUtf8,

    #[error("nesting deeper than 16 levels")]
    TooDeep,
}

/// Decode one item from the start of `buf`
///
/// Returns the item and the number of bytes it occupied, so callers can keep
/// decoding whatever follows.
pub fn decode(buf: &[u8]) -> Result<(Value, usize), CborError> {
    let mut reader = ByteReader::new(buf);
    let value = decode_from(&mut reader)?;
    Ok((value, reader.position()))
}

/// Decode one item at the reader's current position
pub fn decode_from(reader: &mut ByteReader<'_>) -> Result<Value, CborError> {
    decode_item(reader, 0)
}

fn decode_item(reader: &mut ByteReader<'_>, depth: usize) -> Result<Value, CborError> {
    let initial = reader.read_u8()?;
    let major = initial >> 5;
    let additional = initial & 0x1f;

    let argument = match additional {
        0..=23 => u64::from(additional),
        24 => u64::from(reader.read_u8()?),
        25 => u64::from(reader.read_u16_be()?),
        26 => u64::from(reader.read_u32_be()?),
        _ => return Err(CborError::UnsupportedEncoding { major, additional }),
    };

    match major {
        0 => Ok(Value::Unsigned(argument)),
        // argument is at most u32::MAX, so this cannot overflow
        1 => Ok(Value::Negative(-1 - argument as i64)),
        2 => {
            let bytes = reader.take(length(argument))?;
            Ok(Value::Bytes(bytes.to_vec()))
        }
        3 => {
            let bytes = reader.take(length(argument))?;
            let text = std::str::from_utf8(bytes).map_err(|_| CborError::InvalidUtf8)?;
            Ok(Value::Text(text.to_owned()))
        }
        4 => {
            if depth >= MAX_DEPTH {
                return Err(CborError::TooDeep);
            }
            // No preallocation: the count is attacker supplied. Every item
            // needs at least one byte, so a lying count hits the end quickly.
            let mut items = Vec::new();
            for _ in 0..argument {
                items.push(decode_item(reader, depth + 1)?);
            }
            Ok(Value::Array(items))
        }
        5 => {
            if depth >= MAX_DEPTH {
                return Err(CborError::TooDeep);
            }
            let mut entries = Vec::new();
            for _ in 0..argument {
                let key = decode_item(reader, depth + 1)?;
                let value = decode_item(reader, depth + 1)?;
                entries.push((key, value));
            }
            Ok(Value::Map(entries))
        }
        other => Err(CborError::UnsupportedMajorType(other)),
    }
}

fn length(argument: u64) -> usize {
    // saturating; the bounds check rejects anything this large
    usize::try_from(argument).unwrap_or(usize::MAX)
}

#[cfg(test)]
impl Value {
    /// Canonical encoding, used by tests to build authenticator output
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        fn head(out: &mut Vec<u8>, major: u8, argument: u64) {
            let major = major << 5;
            match argument {
                0..=23 => out.push(major | argument as u8),
                24..=0xff => out.extend_from_slice(&[major | 24, argument as u8]),
                0x100..=0xffff => {
                    out.push(major | 25);
                    out.extend_from_slice(&(argument as u16).to_be_bytes());
                }
                0x1_0000..=0xffff_ffff => {
                    out.push(major | 26);
                    out.extend_from_slice(&(argument as u32).to_be_bytes());
                }
                _ => panic!("argument {argument} needs an 8-byte head"),
            }
        }

        match self {
            Value::Unsigned(n) => head(out, 0, *n),
            Value::Negative(n) => head(out, 1, (-1 - *n) as u64),
            Value::Bytes(b) => {
                head(out, 2, b.len() as u64);
                out.extend_from_slice(b);
            }
            Value::Text(t) => {
                head(out, 3, t.len() as u64);
                out.extend_from_slice(t.as_bytes());
            }
            Value::Array(items) => {
                head(out, 4, items.len() as u64);
                for item in items {
                    item.encode_into(out);
                }
            }
            Value::Map(entries) => {
                head(out, 5, entries.len() as u64);
                for (k, v) in entries {
                    k.encode_into(out);
                    v.encode_into(out);
                }
            }
        }
    }
}
