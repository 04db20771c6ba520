//! # Native Buffer
//!
//! A growable, singly-owned region of backend memory with a capacity (bytes
//! allocated) and a position (bytes written).
//!
//! ## Invariants
//!
//! - `position <= capacity`
//! - every byte below `position` was written through this buffer since it
//!   was last emptied; positioned reads and writes never reach past it
//! - `address` is null exactly when `capacity == 0`
//! - a new region is allocated before the old one is freed, so a failed
//!   allocation leaves the buffer untouched
//!
//! Dropping a buffer destroys it; there is no way to leak the region.

use crate::config::{Options, TextEncoding, DEFAULT_SHRINK_THRESHOLD};
use crate::memory::{Address, Backend};
use crate::{Error, Result};
use bytes::Bytes;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// Smallest capacity ever allocated.
pub const MIN_CAPACITY: usize = 8;

/// Owned, growable region of native memory.
///
/// # Example
///
/// ```rust
/// use levelcodec::buffer::NativeBuffer;
/// use levelcodec::config::BackendKind;
/// use levelcodec::select_backend;
///
/// # fn main() -> Result<(), levelcodec::Error> {
/// let mut buf = NativeBuffer::new(select_backend(BackendKind::Auto));
/// buf.append(b"hello world", 0, 5)?;
/// assert_eq!(buf.as_slice(), b"hello");
/// # Ok(())
/// # }
/// ```
pub struct NativeBuffer {
    backend: Backend,
    address: Address,
    capacity: usize,
    position: usize,
    shrink_threshold: usize,
    encoding: TextEncoding,
}

macro_rules! setters {
    ($($name:ident, $write:ident, $ty:ty, $n:expr);* $(;)?) => {
        $(
            /// Replaces the contents with a single little-endian value.
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                self.position = 0;
                self.ensure_capacity(false, $n)?;
                // SAFETY: capacity >= $n after ensure_capacity.
                unsafe { self.backend.raw().$write(self.address, 0, value) };
                self.position = $n;
                Ok(())
            }
        )*
    };
}

macro_rules! accessors {
    ($($get:ident, $put:ident, $read:ident, $write:ident, $ty:ty, $n:expr);* $(;)?) => {
        $(
            /// Reads a value at `off`, bounds-checked against the position.
            pub fn $get(&self, off: usize) -> Result<$ty> {
                self.check_written(off, $n)?;
                // SAFETY: range checked above.
                Ok(unsafe { self.backend.raw().$read(self.address, off) })
            }

            /// Overwrites already-written bytes at `off`. The position is not
            /// moved.
            pub fn $put(&mut self, off: usize, value: $ty) -> Result<()> {
                self.check_written(off, $n)?;
                // SAFETY: range checked above.
                unsafe { self.backend.raw().$write(self.address, off, value) };
                Ok(())
            }
        )*
    };
}

impl NativeBuffer {
    /// Creates an empty, unallocated buffer.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            address: Address::NULL,
            capacity: 0,
            position: 0,
            shrink_threshold: DEFAULT_SHRINK_THRESHOLD,
            encoding: TextEncoding::Utf8,
        }
    }

    /// Creates an empty buffer that takes its shrink threshold and text
    /// encoding from `options`.
    pub fn with_options(backend: Backend, options: &Options) -> Self {
        let mut buf = Self::new(backend);
        buf.shrink_threshold = options.shrink_threshold;
        buf.encoding = options.text_encoding;
        buf
    }

    /// Creates a buffer with at least `capacity` bytes allocated.
    pub fn with_capacity(backend: Backend, capacity: usize) -> Result<Self> {
        let mut buf = Self::new(backend);
        buf.ensure_capacity(false, capacity)?;
        Ok(buf)
    }

    /// Creates a buffer holding a copy of `data`.
    pub fn from_slice(backend: Backend, data: &[u8]) -> Result<Self> {
        let mut buf = Self::new(backend);
        buf.set_bytes(data)?;
        Ok(buf)
    }

    /// Handle of the current region.
    pub(crate) fn address(&self) -> Address {
        self.address
    }

    /// Bytes currently allocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes logically written.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Text encoding used by the string helpers.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Changes the text encoding used by the string helpers.
    pub fn set_encoding(&mut self, encoding: TextEncoding) {
        self.encoding = encoding;
    }

    /// Capacity above which `clear(true)` shrinks the region.
    pub fn shrink_threshold(&self) -> usize {
        self.shrink_threshold
    }

    /// The backend this buffer allocates from.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Truncates the written bytes to `position`. Moving forward is refused,
    /// so bytes that were never written cannot become visible.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.position {
            return Err(Error::bounds(0, position, self.position));
        }
        self.position = position;
        Ok(())
    }

    /// Grows the region to hold at least `min_len` bytes.
    ///
    /// Does nothing if the capacity is already large enough. Otherwise the
    /// new capacity is 8 for small requests and `min_len * 1.5` beyond that.
    /// With `preserve` the old bytes are copied across; the old region is
    /// freed only after the new one has been allocated.
    pub fn ensure_capacity(&mut self, preserve: bool, min_len: usize) -> Result<()> {
        if self.capacity >= min_len {
            return Ok(());
        }
        let new_capacity = if min_len < MIN_CAPACITY {
            MIN_CAPACITY
        } else {
            min_len
                .checked_add(min_len >> 1)
                .ok_or(Error::AllocationFailure { requested: min_len })?
        };

        let new_address = self.backend.raw().alloc(new_capacity)?;
        log::debug!("Buffer grow {} -> {} (preserve: {})", self.capacity, new_capacity, preserve);

        if !self.address.is_null() {
            // SAFETY: both regions are live, the old one holds `capacity` bytes
            // and the new one is larger.
            unsafe {
                if preserve {
                    self.backend.raw().copy(new_address, 0, self.address, 0, self.capacity);
                }
                self.backend.raw().free(self.address, self.capacity);
            }
        }
        if !preserve {
            self.position = 0;
        }
        self.address = new_address;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Appends `src[off..off + len]` and advances the position.
    pub fn append(&mut self, src: &[u8], off: usize, len: usize) -> Result<()> {
        let end = off.checked_add(len).ok_or_else(|| Error::bounds(off, len, src.len()))?;
        if end > src.len() {
            return Err(Error::bounds(off, len, src.len()));
        }
        self.append_slice(&src[off..end])
    }

    /// Appends all of `src` and advances the position.
    pub fn append_slice(&mut self, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        let end = self.position + src.len();
        self.ensure_capacity(true, end)?;
        // SAFETY: capacity >= end after ensure_capacity.
        unsafe { self.backend.raw().write(self.address, self.position, src) };
        self.position = end;
        Ok(())
    }

    /// Appends one byte.
    pub fn append_u8(&mut self, value: u8) -> Result<()> {
        self.append_slice(&[value])
    }

    /// Appends a string in the buffer's text encoding and returns the number
    /// of bytes written.
    pub fn append_string(&mut self, s: &str) -> Result<usize> {
        let encoded = encode_text(s, self.encoding);
        self.append_slice(&encoded)?;
        Ok(encoded.len())
    }

    setters! {
        set_i16, write_i16_e, i16, 2;
        set_i32, write_i32_e, i32, 4;
        set_i64, write_i64_e, i64, 8;
        set_f32, write_f32_e, f32, 4;
        set_f64, write_f64_e, f64, 8;
    }

    /// Replaces the contents with a single byte.
    pub fn set_i8(&mut self, value: i8) -> Result<()> {
        self.position = 0;
        self.ensure_capacity(false, 1)?;
        // SAFETY: capacity >= 1 after ensure_capacity.
        unsafe { self.backend.raw().write_u8(self.address, 0, value as u8) };
        self.position = 1;
        Ok(())
    }

    /// Replaces the contents with `data`.
    pub fn set_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.position = 0;
        if data.is_empty() {
            return Ok(());
        }
        self.ensure_capacity(false, data.len())?;
        // SAFETY: capacity >= data.len() after ensure_capacity.
        unsafe { self.backend.raw().write(self.address, 0, data) };
        self.position = data.len();
        Ok(())
    }

    /// Replaces the contents with `s` in the buffer's text encoding.
    pub fn set_string(&mut self, s: &str) -> Result<()> {
        let encoded = encode_text(s, self.encoding);
        self.set_bytes(&encoded)
    }

    /// Reads `len` bytes at `off` as text in the buffer's encoding.
    pub fn read_string(&self, off: usize, len: usize) -> Result<String> {
        self.check_written(off, len)?;
        decode_text(&self.as_slice()[off..off + len], self.encoding)
    }

    /// Reads the whole written region as text.
    pub fn get_string(&self) -> Result<String> {
        self.read_string(0, self.position)
    }

    /// Reads one byte at `off`.
    pub fn get_u8(&self, off: usize) -> Result<u8> {
        self.check_written(off, 1)?;
        // SAFETY: range checked above.
        Ok(unsafe { self.backend.raw().read_u8(self.address, off) })
    }

    /// Overwrites one written byte at `off`. The position is not moved.
    pub fn put_u8(&mut self, off: usize, value: u8) -> Result<()> {
        self.check_written(off, 1)?;
        // SAFETY: range checked above.
        unsafe { self.backend.raw().write_u8(self.address, off, value) };
        Ok(())
    }

    accessors! {
        get_i16, put_i16, read_i16, write_i16, i16, 2;
        get_i32, put_i32, read_i32, write_i32, i32, 4;
        get_i64, put_i64, read_i64, write_i64, i64, 8;
        get_f32, put_f32, read_f32, write_f32, f32, 4;
        get_f64, put_f64, read_f64, write_f64, f64, 8;
        get_i16_e, put_i16_e, read_i16_e, write_i16_e, i16, 2;
        get_i32_e, put_i32_e, read_i32_e, write_i32_e, i32, 4;
        get_i64_e, put_i64_e, read_i64_e, write_i64_e, i64, 8;
        get_f32_e, put_f32_e, read_f32_e, write_f32_e, f32, 4;
        get_f64_e, put_f64_e, read_f64_e, write_f64_e, f64, 8;
    }

    /// Logically empties the buffer.
    ///
    /// With `shrink`, a region larger than the shrink threshold is freed and
    /// reallocated at exactly the threshold size.
    pub fn clear(&mut self, shrink: bool) -> Result<()> {
        self.position = 0;
        if shrink && self.capacity > self.shrink_threshold {
            let smaller = self.backend.raw().alloc(self.shrink_threshold)?;
            log::debug!("Buffer shrink {} -> {}", self.capacity, self.shrink_threshold);
            // SAFETY: the old region is live with `capacity` bytes.
            unsafe { self.backend.raw().free(self.address, self.capacity) };
            self.address = smaller;
            self.capacity = self.shrink_threshold;
        }
        Ok(())
    }

    /// Frees the region and zeroes every field. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if !self.address.is_null() {
            // SAFETY: the region is live with `capacity` bytes.
            unsafe { self.backend.raw().free(self.address, self.capacity) };
        }
        self.address = Address::NULL;
        self.capacity = 0;
        self.position = 0;
    }

    /// Returns true once the buffer holds no region.
    pub fn is_destroyed(&self) -> bool {
        self.address.is_null()
    }

    /// View of the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        if self.position == 0 {
            return &[];
        }
        // SAFETY: the region is live and `position <= capacity`; the borrow of
        // `self` prevents any reallocation while the slice is alive.
        unsafe { std::slice::from_raw_parts(self.backend.raw().ptr(self.address), self.position) }
    }

    /// Copies the written bytes out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Copies the written bytes into a `Bytes`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_slice())
    }

    /// Compares the written bytes of two buffers lexicographically.
    pub fn compare(&self, other: &NativeBuffer) -> Ordering {
        if self.backend.ptr_eq(&other.backend) && self.position > 0 && other.position > 0 {
            // SAFETY: both regions are live and hold their positions.
            unsafe {
                self.backend.raw().compare(self.address, self.position, other.address, other.position)
            }
        } else {
            self.as_slice().cmp(other.as_slice())
        }
    }

    fn check_written(&self, off: usize, len: usize) -> Result<()> {
        match off.checked_add(len) {
            Some(end) if end <= self.position => Ok(()),
            _ => Err(Error::bounds(off, len, self.position)),
        }
    }
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("backend", &self.backend.kind())
            .field("capacity", &self.capacity)
            .field("position", &self.position)
            .finish()
    }
}

/// Destination for encoded bytes.
///
/// Encoders are written against this trait so the same code can fill a
/// pooled [`NativeBuffer`] or a scratch `Vec<u8>`.
pub trait ByteSink {
    /// Appends `bytes`.
    fn put(&mut self, bytes: &[u8]) -> Result<()>;

    /// Appends one byte.
    fn put_u8(&mut self, value: u8) -> Result<()> {
        self.put(&[value])
    }
}

impl ByteSink for NativeBuffer {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.append_slice(bytes)
    }
}

impl ByteSink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Transcodes `s` into bytes.
pub fn encode_text(s: &str, encoding: TextEncoding) -> Cow<'_, [u8]> {
    match encoding {
        TextEncoding::Utf8 => Cow::Borrowed(s.as_bytes()),
        TextEncoding::Utf16 => {
            Cow::Owned(s.encode_utf16().flat_map(|unit| unit.to_be_bytes()).collect())
        }
    }
}

/// Number of bytes `s` occupies once transcoded.
pub fn text_len(s: &str, encoding: TextEncoding) -> usize {
    match encoding {
        TextEncoding::Utf8 => s.len(),
        TextEncoding::Utf16 => s.encode_utf16().count() * 2,
    }
}

/// Transcodes bytes back into a string.
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String> {
    match encoding {
        TextEncoding::Utf8 => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| Error::malformed(format!("invalid UTF-8 text: {}", e))),
        TextEncoding::Utf16 => {
            if bytes.len() % 2 != 0 {
                return Err(Error::malformed(format!(
                    "UTF-16 text has odd byte length {}",
                    bytes.len()
                )));
            }
            let units: Vec<u16> =
                bytes.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
            String::from_utf16(&units)
                .map_err(|e| Error::malformed(format!("invalid UTF-16 text: {}", e)))
        }
    }
}
