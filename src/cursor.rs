//! Bounds-checked read cursor shared by the value and key decoders.

use crate::{Error, Result};
use bytes::Buf;

/// Forward cursor over `data[..limit]`.
///
/// Every read checks against `limit` first and fails with
/// [`Error::BoundsViolation`] instead of reading past it.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader over the whole slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, limit: data.len() }
    }

    /// Creates a reader starting at `off` that may not read past `limit`.
    pub fn with_limit(data: &'a [u8], off: usize, limit: usize) -> Result<Self> {
        if limit > data.len() || off > limit {
            return Err(Error::bounds(off, limit.saturating_sub(off), data.len()));
        }
        Ok(Self { data, pos: off, limit })
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes left before the limit.
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    /// Returns true once the cursor reached the limit.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.limit
    }

    fn require(&self, len: usize) -> Result<()> {
        if len > self.remaining() {
            return Err(Error::bounds(self.pos, len, self.limit));
        }
        Ok(())
    }

    fn window(&self) -> &'a [u8] {
        &self.data[self.pos..self.limit]
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        let value = self.window().get_u8();
        self.pos += 1;
        Ok(value)
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.require(2)?;
        let value = self.window().get_u16();
        self.pos += 2;
        Ok(value)
    }

    /// Reads a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.require(4)?;
        let value = self.window().get_u32();
        self.pos += 4;
        Ok(value)
    }

    /// Reads a big-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.require(8)?;
        let value = self.window().get_u64();
        self.pos += 8;
        Ok(value)
    }

    /// Borrows the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.require(len)?;
        let bytes = &self.window()[..len];
        self.pos += len;
        Ok(bytes)
    }

    /// Borrows everything up to the limit.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let bytes = self.window();
        self.pos = self.limit;
        bytes
    }
}
