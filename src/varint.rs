//! # Varint Codec
//!
//! Self-delimiting integer packing with a length selector in the top bits of
//! the first byte.
//!
//! ## Format
//!
//! ```text
//! 32-bit, 2-bit selector s (total payload bytes = s + 1):
//!
//!   merged:    [ s:2 | high:6 ] [ s bytes big-endian ]        high != 0
//!   separate:  [ s:2 | 000000 ] [ s+1 bytes big-endian ]
//!
//! 64-bit, 3-bit selector s:
//!
//!   merged:    [ s:3 | high:5 ] [ s bytes big-endian ]        high != 0
//!   separate:  [ s:3 | 00000 ]  [ s+1 bytes big-endian ]
//! ```
//!
//! The merged form is used when the value's significant bits leave room for
//! the selector in their top byte. Zero always uses the separate form
//! (`[0x00, 0x00]`) so that a zero payload in the header byte unambiguously
//! marks "separate". Packing works on raw bit patterns: negative numbers take
//! the full width, floats are packed as their bits.

use crate::buffer::ByteSink;
use crate::cursor::Reader;
use crate::Result;

/// Largest encoded size of a 32-bit value.
pub const MAX_LEN32: usize = 5;

/// Largest encoded size of a 64-bit value.
pub const MAX_LEN64: usize = 9;

/// A packed integer held on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packed {
    bytes: [u8; MAX_LEN64],
    len: usize,
}

impl Packed {
    /// The encoded bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Encoded length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; every packed value has at least one byte.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn pack(raw: u64, width: usize, selector_bits: usize) -> Packed {
    let bits = 64 - raw.leading_zeros() as usize;
    let src = bits.div_ceil(8);
    let merged = (bits + selector_bits).div_ceil(8);
    let be = raw.to_be_bytes();
    let shift = 8 - selector_bits;
    let mut out = Packed { bytes: [0u8; MAX_LEN64], len: 0 };

    if merged == src {
        let first = 8 - src;
        out.bytes[0] = (((src - 1) << shift) as u8) | be[first];
        out.bytes[1..src].copy_from_slice(&be[first + 1..]);
        out.len = src;
    } else {
        let n = src.clamp(1, width);
        out.bytes[0] = ((n - 1) << shift) as u8;
        out.bytes[1..=n].copy_from_slice(&be[8 - n..]);
        out.len = n + 1;
    }
    out
}

fn unpack(reader: &mut Reader<'_>, selector_bits: usize) -> Result<u64> {
    let shift = 8 - selector_bits;
    let mask = (1u8 << shift) - 1;
    let header = reader.read_u8()?;
    let selector = (header >> shift) as usize;

    let (mut value, follow) = if header & mask == 0 {
        (0u64, selector + 1)
    } else {
        ((header & mask) as u64, selector)
    };
    for b in reader.read_bytes(follow)? {
        value = (value << 8) | *b as u64;
    }
    Ok(value)
}

/// Packs a 32-bit value (1 to 5 bytes).
pub fn pack32(value: i32) -> Packed {
    pack(value as u32 as u64, 4, 2)
}

/// Packs a 64-bit value (1 to 9 bytes).
pub fn pack64(value: i64) -> Packed {
    pack(value as u64, 8, 3)
}

/// Unpacks a 32-bit value.
pub fn unpack32(reader: &mut Reader<'_>) -> Result<i32> {
    Ok(unpack(reader, 2)? as u32 as i32)
}

/// Unpacks a 64-bit value.
pub fn unpack64(reader: &mut Reader<'_>) -> Result<i64> {
    Ok(unpack(reader, 3)? as i64)
}

/// Encoded size of `value` under the 32-bit packer.
pub fn encoded_len32(value: i32) -> usize {
    pack32(value).len()
}

/// Encoded size of `value` under the 64-bit packer.
pub fn encoded_len64(value: i64) -> usize {
    pack64(value).len()
}

/// Appends a packed 32-bit value to `out`.
pub fn write32<S: ByteSink + ?Sized>(out: &mut S, value: i32) -> Result<()> {
    out.put(pack32(value).as_slice())
}

/// Appends a packed 64-bit value to `out`.
pub fn write64<S: ByteSink + ?Sized>(out: &mut S, value: i64) -> Result<()> {
    out.put(pack64(value).as_slice())
}

/// Appends a length as a packed 32-bit value.
pub(crate) fn write_len<S: ByteSink + ?Sized>(buf: &mut S, len: usize) -> Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| crate::Error::malformed(format!("length {} does not fit in 31 bits", len)))?;
    write32(buf, len)
}

/// Reads a length written by [`write_len`].
pub(crate) fn read_len(reader: &mut Reader<'_>) -> Result<usize> {
    let len = unpack32(reader)?;
    usize::try_from(len).map_err(|_| crate::Error::malformed(format!("negative length {}", len)))
}
