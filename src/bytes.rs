//! Byte codecs: hex, script integers and a bounded reader
//!
//! Script integers are sign-magnitude little-endian: the high bit of the last
//! byte is the sign, an empty array is zero, and the minimal encoding only adds
//! a trailing byte when needed to keep the sign bit clear.

use crate::error::{CodecError, Result};
use crate::types::ByteString;
use bitcoin_hashes::hex::{self, FromHex, ToHex};
use num_bigint::BigUint;
use serde::Serializer;

/// Decode a hex string, accepting both cases
pub fn hex_to_bytes(hex: &str) -> Result<ByteString> {
    Vec::<u8>::from_hex(hex).map_err(|e| match e {
        hex::Error::OddLengthString(len) => {
            CodecError::MalformedHex(format!("hex string has odd length {}", len))
        }
        hex::Error::InvalidChar(ch) => {
            CodecError::MalformedHex(format!("character {:?} is not a hex digit", ch as char))
        }
        other => CodecError::MalformedHex(other.to_string()),
    })
}

/// Encode bytes as lowercase hex
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.to_hex()
}

/// Minimal sign-magnitude little-endian encoding of a script integer
///
/// Zero encodes to the empty array.
pub fn int_le_to_bytes(n: i64) -> ByteString {
    if n == 0 {
        return ByteString::new();
    }

    let negative = n < 0;
    let mut abs = n.unsigned_abs();
    let mut out = ByteString::with_capacity(9);
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }

    // `out` is non-empty because n != 0
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

/// Decode a sign-magnitude little-endian script integer
///
/// Non-minimal encodings decode to the same value as their minimal form.
/// Magnitudes that do not fit in an `i64` saturate.
pub fn bytes_to_int_le(bytes: &[u8]) -> i64 {
    let Some((&last, rest)) = bytes.split_last() else {
        return 0;
    };
    let negative = last & 0x80 != 0;
    let magnitude_bytes = rest.iter().copied().chain(std::iter::once(last & 0x7f));

    let mut magnitude: u64 = 0;
    for (i, byte) in magnitude_bytes.enumerate() {
        if byte == 0 {
            continue;
        }
        if i >= 8 {
            magnitude = u64::MAX;
            break;
        }
        magnitude |= (byte as u64) << (8 * i);
    }
    if negative {
        if magnitude >= 1 << 63 {
            i64::MIN
        } else {
            -(magnitude as i64)
        }
    } else {
        magnitude.min(i64::MAX as u64) as i64
    }
}

/// Unsigned little-endian decode, saturating past 64 bits
pub fn bytes_to_uint_le(bytes: &[u8]) -> u64 {
    let mut res: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if byte == 0 {
            continue;
        }
        if i >= 8 {
            return u64::MAX;
        }
        res |= (byte as u64) << (8 * i);
    }
    res
}

/// Fixed-width unsigned little-endian encoding, truncating high bytes
pub fn uint_le_to_bytes_fixed(n: u64, size: usize) -> ByteString {
    (0..size)
        .map(|i| if i < 8 { (n >> (8 * i)) as u8 } else { 0 })
        .collect()
}

/// Arbitrary-precision unsigned little-endian decode
pub fn bytes_to_bigint_le(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_le(bytes)
}

/// Arbitrary-precision unsigned big-endian decode
pub fn bytes_to_bigint_be(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

pub fn bytes_equal(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Compare two big-endian unsigned integers, ignoring leading zero bytes
pub fn uint_be_equal(a: &[u8], b: &[u8]) -> bool {
    fn strip(bytes: &[u8]) -> &[u8] {
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        &bytes[first..]
    }
    strip(a) == strip(b)
}

pub fn reverse_bytes(bytes: &[u8]) -> ByteString {
    bytes.iter().rev().copied().collect()
}

/// A piece of a concatenation: a single byte or a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytesPart<'a> {
    Byte(u8),
    Slice(&'a [u8]),
}

impl From<u8> for BytesPart<'_> {
    fn from(byte: u8) -> Self {
        BytesPart::Byte(byte)
    }
}

impl<'a> From<&'a [u8]> for BytesPart<'a> {
    fn from(slice: &'a [u8]) -> Self {
        BytesPart::Slice(slice)
    }
}

impl<'a> From<&'a ByteString> for BytesPart<'a> {
    fn from(bytes: &'a ByteString) -> Self {
        BytesPart::Slice(bytes)
    }
}

pub fn concat_bytes(parts: &[BytesPart<'_>]) -> ByteString {
    let len = parts
        .iter()
        .map(|part| match part {
            BytesPart::Byte(_) => 1,
            BytesPart::Slice(s) => s.len(),
        })
        .sum();
    let mut out = ByteString::with_capacity(len);
    for part in parts {
        match part {
            BytesPart::Byte(b) => out.push(*b),
            BytesPart::Slice(s) => out.extend_from_slice(s),
        }
    }
    out
}

/// Cursor over an immutable byte buffer
///
/// Reads past the end fail with [`CodecError::OutOfRange`] and leave the
/// cursor untouched.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    pub fn read(&mut self, size: usize) -> Result<&'a [u8]> {
        if size > self.remaining() {
            return Err(CodecError::OutOfRange {
                position: self.position,
                needed: size,
                available: self.remaining(),
            });
        }
        let start = self.position;
        self.position += size;
        Ok(&self.data[start..self.position])
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn read_uint_le(&mut self, size: usize) -> Result<u64> {
        self.read(size).map(bytes_to_uint_le)
    }

    /// Consume everything left in the buffer
    pub fn read_to_end(&mut self) -> &'a [u8] {
        let rest = &self.data[self.position..];
        self.position = self.data.len();
        rest
    }
}

pub(crate) fn serialize_hex<T, S>(bytes: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&bytes_to_hex(bytes.as_ref()))
}

pub(crate) fn serialize_hex_stack<S>(
    stack: &[ByteString],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(stack.iter().map(|item| bytes_to_hex(item)))
}
