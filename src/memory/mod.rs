//! # Memory Backend
//!
//! Low-level access to the raw regions that back every
//! [`NativeBuffer`](crate::buffer::NativeBuffer).
//!
//! ## Design
//!
//! - `MemoryBackend` is the single crate-internal seam; callers never branch
//!   on which implementation is active
//! - the direct backend hands out zeroed allocator pointers (fast path)
//! - the native backend keeps regions in a locked handle table (always
//!   available, slower)
//! - [`select_backend`] picks one and wraps it in an opaque [`Backend`]; the
//!   `Auto` choice is made once per process
//!
//! Raw addresses never leave the crate. Outside code only sees the safe
//! views of [`NativeBuffer`](crate::buffer::NativeBuffer).
//!
//! ## Endianness
//!
//! The host byte order is probed once by writing `0x0102030405060708` and
//! reading back the first byte. The `_e` accessors swap bytes on big-endian
//! hosts so that stored multi-byte values are always little-endian.

mod direct;
mod native;

pub(crate) use direct::DirectBackend;
pub(crate) use native::NativeBackend;

use crate::config::BackendKind;
use crate::Result;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Pattern written by the endian probe.
const ENDIAN_PROBE: u64 = 0x0102_0304_0506_0708;

/// Opaque handle to a region handed out by a backend.
///
/// `Address::NULL` means "unallocated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct Address(usize);

impl Address {
    /// The unallocated address.
    pub(crate) const NULL: Address = Address(0);

    pub(crate) fn from_raw(raw: usize) -> Self {
        Address(raw)
    }

    /// Returns true if this is the unallocated address.
    pub(crate) fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw handle value.
    pub(crate) fn as_usize(&self) -> usize {
        self.0
    }
}

/// Host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl Endian {
    /// Probes the byte order of the running host.
    pub fn probe() -> Endian {
        let bytes = ENDIAN_PROBE.to_ne_bytes();
        if bytes[0] == 0x01 {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    /// Returns true for big-endian.
    pub fn is_big(&self) -> bool {
        matches!(self, Endian::Big)
    }

    /// Applies endian correction for a host of this byte order.
    pub fn correct_i16(&self, v: i16) -> i16 {
        if self.is_big() {
            v.swap_bytes()
        } else {
            v
        }
    }

    /// Applies endian correction for a host of this byte order.
    pub fn correct_i32(&self, v: i32) -> i32 {
        if self.is_big() {
            v.swap_bytes()
        } else {
            v
        }
    }

    /// Applies endian correction for a host of this byte order.
    pub fn correct_i64(&self, v: i64) -> i64 {
        if self.is_big() {
            v.swap_bytes()
        } else {
            v
        }
    }

    /// Bytes a host of this byte order would store for `v`.
    pub fn native_bytes_i32(&self, v: i32) -> [u8; 4] {
        match self {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        }
    }

    /// Bytes a host of this byte order would store for `v`.
    pub fn native_bytes_i64(&self, v: i64) -> [u8; 8] {
        match self {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        }
    }
}

/// Returns the host byte order, probed once.
pub fn host_endian() -> Endian {
    static HOST: OnceLock<Endian> = OnceLock::new();
    *HOST.get_or_init(Endian::probe)
}

macro_rules! plain_accessors {
    ($($read:ident, $write:ident, $ty:ty, $n:expr);* $(;)?) => {
        $(
            /// Reads a host-order value at `addr + off`.
            ///
            /// # Safety
            ///
            /// The region must be live and hold at least `off + size_of` bytes.
            unsafe fn $read(&self, addr: Address, off: usize) -> $ty {
                let mut raw = [0u8; $n];
                self.read(addr, off, &mut raw);
                <$ty>::from_ne_bytes(raw)
            }

            /// Writes a host-order value at `addr + off`.
            ///
            /// # Safety
            ///
            /// The region must be live and hold at least `off + size_of` bytes.
            unsafe fn $write(&self, addr: Address, off: usize, value: $ty) {
                self.write(addr, off, &value.to_ne_bytes());
            }
        )*
    };
}

/// Raw memory access strategy.
///
/// # Safety
///
/// Implementors guarantee that an address returned by [`alloc`](Self::alloc)
/// refers to at least the requested number of writable bytes until it is
/// passed to [`free`](Self::free), and that [`ptr`](Self::ptr) returns a
/// pointer to the start of that region which stays valid for the same span.
pub(crate) unsafe trait MemoryBackend: Send + Sync + fmt::Debug {
    /// Which strategy this is.
    fn kind(&self) -> BackendKind;

    /// Allocates `len` bytes. `len` must be non-zero.
    fn alloc(&self, len: usize) -> Result<Address>;

    /// Frees a region previously returned by `alloc(len)`.
    ///
    /// # Safety
    ///
    /// `addr` must be live and `len` must be the length it was allocated with.
    unsafe fn free(&self, addr: Address, len: usize);

    /// Returns the start pointer of a live region.
    ///
    /// # Safety
    ///
    /// `addr` must be live.
    unsafe fn ptr(&self, addr: Address) -> *mut u8;

    /// Copies `dst.len()` bytes out of the region.
    ///
    /// # Safety
    ///
    /// `addr` must be live and hold `off + dst.len()` bytes.
    unsafe fn read(&self, addr: Address, off: usize, dst: &mut [u8]);

    /// Copies `src` into the region.
    ///
    /// # Safety
    ///
    /// `addr` must be live and hold `off + src.len()` bytes.
    unsafe fn write(&self, addr: Address, off: usize, src: &[u8]);

    /// Copies `len` bytes between (possibly identical) regions.
    ///
    /// # Safety
    ///
    /// Both regions must be live and large enough.
    unsafe fn copy(&self, dst: Address, dst_off: usize, src: Address, src_off: usize, len: usize) {
        let s = self.ptr(src).add(src_off);
        let d = self.ptr(dst).add(dst_off);
        std::ptr::copy(s, d, len);
    }

    /// Sets `len` bytes to `value`.
    ///
    /// # Safety
    ///
    /// `addr` must be live and hold `off + len` bytes.
    unsafe fn fill(&self, addr: Address, off: usize, value: u8, len: usize) {
        std::ptr::write_bytes(self.ptr(addr).add(off), value, len);
    }

    /// Compares two byte ranges lexicographically.
    ///
    /// # Safety
    ///
    /// Both regions must be live and hold the given lengths.
    unsafe fn compare(&self, a: Address, len_a: usize, b: Address, len_b: usize) -> Ordering {
        let left: &[u8] =
            if len_a == 0 { &[] } else { std::slice::from_raw_parts(self.ptr(a), len_a) };
        let right: &[u8] =
            if len_b == 0 { &[] } else { std::slice::from_raw_parts(self.ptr(b), len_b) };
        left.cmp(right)
    }

    /// Reads one byte.
    ///
    /// # Safety
    ///
    /// `addr` must be live and hold `off + 1` bytes.
    unsafe fn read_u8(&self, addr: Address, off: usize) -> u8 {
        let mut raw = [0u8; 1];
        self.read(addr, off, &mut raw);
        raw[0]
    }

    /// Writes one byte.
    ///
    /// # Safety
    ///
    /// `addr` must be live and hold `off + 1` bytes.
    unsafe fn write_u8(&self, addr: Address, off: usize, value: u8) {
        self.write(addr, off, &[value]);
    }

    plain_accessors! {
        read_i16, write_i16, i16, 2;
        read_i32, write_i32, i32, 4;
        read_i64, write_i64, i64, 8;
        read_f32, write_f32, f32, 4;
        read_f64, write_f64, f64, 8;
    }

    /// Reads a little-endian `i16` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`read_i16`](Self::read_i16).
    unsafe fn read_i16_e(&self, addr: Address, off: usize) -> i16 {
        host_endian().correct_i16(self.read_i16(addr, off))
    }

    /// Writes a little-endian `i16` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`write_i16`](Self::write_i16).
    unsafe fn write_i16_e(&self, addr: Address, off: usize, value: i16) {
        self.write_i16(addr, off, host_endian().correct_i16(value));
    }

    /// Reads a little-endian `i32` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`read_i32`](Self::read_i32).
    unsafe fn read_i32_e(&self, addr: Address, off: usize) -> i32 {
        host_endian().correct_i32(self.read_i32(addr, off))
    }

    /// Writes a little-endian `i32` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`write_i32`](Self::write_i32).
    unsafe fn write_i32_e(&self, addr: Address, off: usize, value: i32) {
        self.write_i32(addr, off, host_endian().correct_i32(value));
    }

    /// Reads a little-endian `i64` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`read_i64`](Self::read_i64).
    unsafe fn read_i64_e(&self, addr: Address, off: usize) -> i64 {
        host_endian().correct_i64(self.read_i64(addr, off))
    }

    /// Writes a little-endian `i64` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`write_i64`](Self::write_i64).
    unsafe fn write_i64_e(&self, addr: Address, off: usize, value: i64) {
        self.write_i64(addr, off, host_endian().correct_i64(value));
    }

    /// Reads a little-endian `f32` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`read_i32`](Self::read_i32).
    unsafe fn read_f32_e(&self, addr: Address, off: usize) -> f32 {
        f32::from_bits(self.read_i32_e(addr, off) as u32)
    }

    /// Writes a little-endian `f32` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`write_i32`](Self::write_i32).
    unsafe fn write_f32_e(&self, addr: Address, off: usize, value: f32) {
        self.write_i32_e(addr, off, value.to_bits() as i32);
    }

    /// Reads a little-endian `f64` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`read_i64`](Self::read_i64).
    unsafe fn read_f64_e(&self, addr: Address, off: usize) -> f64 {
        f64::from_bits(self.read_i64_e(addr, off) as u64)
    }

    /// Writes a little-endian `f64` regardless of host order.
    ///
    /// # Safety
    ///
    /// See [`write_i64`](Self::write_i64).
    unsafe fn write_f64_e(&self, addr: Address, off: usize, value: f64) {
        self.write_i64_e(addr, off, value.to_bits() as i64);
    }
}

/// Shared handle to the memory strategy behind a set of buffers.
///
/// Cloning is cheap. The handle exposes no raw access; memory is only
/// reachable through [`NativeBuffer`](crate::buffer::NativeBuffer).
#[derive(Debug, Clone)]
pub struct Backend {
    inner: Arc<dyn MemoryBackend>,
}

impl Backend {
    fn new(inner: Arc<dyn MemoryBackend>) -> Self {
        Self { inner }
    }

    /// Which strategy this handle uses. Never `Auto`.
    pub fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    /// Returns true if both handles share one backend instance.
    pub fn ptr_eq(&self, other: &Backend) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn raw(&self) -> &dyn MemoryBackend {
        &*self.inner
    }
}

/// Returns the backend for `kind`.
///
/// `BackendKind::Auto` is resolved once per process: the direct backend is
/// probed and the native one is used if the probe fails. Every later `Auto`
/// request gets the same instance.
pub fn select_backend(kind: BackendKind) -> Backend {
    static SELECTED: OnceLock<Backend> = OnceLock::new();

    match kind {
        BackendKind::Direct => Backend::new(Arc::new(DirectBackend::new())),
        BackendKind::Native => Backend::new(Arc::new(NativeBackend::new())),
        BackendKind::Auto => SELECTED
            .get_or_init(|| {
                let endian = host_endian();
                let backend = if DirectBackend::probe() {
                    Backend::new(Arc::new(DirectBackend::new()))
                } else {
                    log::warn!("Direct memory probe failed, falling back to native backend");
                    Backend::new(Arc::new(NativeBackend::new()))
                };
                log::info!("Selected {:?} memory backend (host endian: {:?})", backend.kind(), endian);
                backend
            })
            .clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends() -> Vec<Backend> {
        vec![select_backend(BackendKind::Direct), select_backend(BackendKind::Native)]
    }

    #[test]
    fn test_host_endian_matches_target() {
        let expected = if cfg!(target_endian = "big") { Endian::Big } else { Endian::Little };
        assert_eq!(Endian::probe(), expected);
        assert_eq!(host_endian(), expected);
    }

    #[test]
    fn test_endian_correction_simulated_hosts() {
        for host in [Endian::Little, Endian::Big] {
            let stored = host.native_bytes_i32(host.correct_i32(0x1122_3344));
            assert_eq!(stored, 0x1122_3344i32.to_le_bytes());

            let stored = host.native_bytes_i64(host.correct_i64(-2));
            assert_eq!(stored, (-2i64).to_le_bytes());
        }
    }

    #[test]
    fn test_backends_byte_identical() {
        let mut images = Vec::new();
        for handle in backends() {
            let backend = handle.raw();
            let addr = backend.alloc(32).unwrap();
            unsafe {
                backend.fill(addr, 0, 0, 32);
                backend.write_u8(addr, 0, 0xab);
                backend.write_i16_e(addr, 1, -300);
                backend.write_i32_e(addr, 3, 0x0102_0304);
                backend.write_i64_e(addr, 7, i64::MIN + 5);
                backend.write_f64_e(addr, 15, 1.5);
                backend.write_f32_e(addr, 23, -0.25);

                assert_eq!(backend.read_u8(addr, 0), 0xab);
                assert_eq!(backend.read_i16_e(addr, 1), -300);
                assert_eq!(backend.read_i32_e(addr, 3), 0x0102_0304);
                assert_eq!(backend.read_i64_e(addr, 7), i64::MIN + 5);
                assert_eq!(backend.read_f64_e(addr, 15), 1.5);
                assert_eq!(backend.read_f32_e(addr, 23), -0.25);

                let mut image = vec![0u8; 32];
                backend.read(addr, 0, &mut image);
                images.push(image);
                backend.free(addr, 32);
            }
        }
        assert_eq!(images[0], images[1]);
        assert_eq!(&images[0][3..7], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_copy_and_compare() {
        for handle in backends() {
            let backend = handle.raw();
            let a = backend.alloc(8).unwrap();
            let b = backend.alloc(8).unwrap();
            unsafe {
                backend.write(a, 0, b"abcdefgh");
                backend.copy(b, 0, a, 0, 8);
                assert_eq!(backend.compare(a, 8, b, 8), Ordering::Equal);

                backend.write_u8(b, 7, b'z');
                assert_eq!(backend.compare(a, 8, b, 8), Ordering::Less);
                assert_eq!(backend.compare(a, 3, b, 8), Ordering::Less);
                assert_eq!(backend.compare(b, 8, a, 7), Ordering::Greater);

                backend.free(a, 8);
                backend.free(b, 8);
            }
        }
    }

    #[test]
    fn test_auto_selection_is_stable() {
        let first = select_backend(BackendKind::Auto);
        let second = select_backend(BackendKind::Auto);
        assert!(first.ptr_eq(&second));
        assert!(!select_backend(BackendKind::Native).ptr_eq(&select_backend(BackendKind::Native)));
        assert_ne!(first.kind(), BackendKind::Auto);
    }
}
