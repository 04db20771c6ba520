//! Direct raw-memory backend.

use super::{Address, MemoryBackend};
use crate::config::BackendKind;
use crate::{Error, Result};
use std::alloc::{self, Layout};

/// Alignment of every region; wide enough for any primitive accessor.
const REGION_ALIGN: usize = 8;

/// Backend that hands out allocator pointers as addresses.
///
/// Regions come back zero-filled so no caller can observe what the
/// allocator previously stored there.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DirectBackend;

impl DirectBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        DirectBackend
    }

    /// Checks that raw allocation and pointer access behave as expected on
    /// this host.
    pub fn probe() -> bool {
        let backend = DirectBackend;
        let Ok(addr) = backend.alloc(8) else {
            return false;
        };
        // SAFETY: `addr` was just allocated with 8 bytes.
        let ok = unsafe {
            backend.write_i64(addr, 0, super::ENDIAN_PROBE as i64);
            backend.read_i64(addr, 0) == super::ENDIAN_PROBE as i64
        };
        // SAFETY: `addr` is live and was allocated with 8 bytes.
        unsafe { backend.free(addr, 8) };
        ok
    }

    fn layout(len: usize) -> Result<Layout> {
        Layout::from_size_align(len, REGION_ALIGN)
            .map_err(|_| Error::AllocationFailure { requested: len })
    }
}

// SAFETY: addresses are allocator pointers of at least the requested size,
// valid until `free` is called with the same length.
unsafe impl MemoryBackend for DirectBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    fn alloc(&self, len: usize) -> Result<Address> {
        if len == 0 {
            return Err(Error::invalid_argument("cannot allocate an empty region"));
        }
        let layout = Self::layout(len)?;
        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(Error::AllocationFailure { requested: len });
        }
        Ok(Address::from_raw(ptr as usize))
    }

    unsafe fn free(&self, addr: Address, len: usize) {
        if addr.is_null() || len == 0 {
            return;
        }
        if let Ok(layout) = Self::layout(len) {
            alloc::dealloc(addr.as_usize() as *mut u8, layout);
        }
    }

    unsafe fn ptr(&self, addr: Address) -> *mut u8 {
        addr.as_usize() as *mut u8
    }

    unsafe fn read(&self, addr: Address, off: usize, dst: &mut [u8]) {
        std::ptr::copy_nonoverlapping(self.ptr(addr).add(off), dst.as_mut_ptr(), dst.len());
    }

    unsafe fn write(&self, addr: Address, off: usize, src: &[u8]) {
        std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr(addr).add(off), src.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_access_self_check() {
        assert!(DirectBackend::probe());
    }

    #[test]
    fn test_zero_length_alloc_rejected() {
        let backend = DirectBackend::new();
        assert!(matches!(backend.alloc(0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_reallocated_region_is_zeroed() {
        let backend = DirectBackend::new();
        for _ in 0..4 {
            let addr = backend.alloc(64).unwrap();
            let mut out = [0xffu8; 64];
            unsafe {
                backend.read(addr, 0, &mut out);
                backend.write(addr, 0, &[0x5a; 64]);
                backend.free(addr, 64);
            }
            assert_eq!(out, [0u8; 64]);
        }
    }

    #[test]
    fn test_oversized_alloc_fails_cleanly() {
        let backend = DirectBackend::new();
        let result = backend.alloc(usize::MAX - 4);
        assert!(matches!(result, Err(Error::AllocationFailure { .. })));
    }
}
