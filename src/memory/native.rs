//! Handle-table backend.
//!
//! Regions live in boxed slices owned by a table; an address is a slot
//! number plus one. Every access takes the table lock, which makes this the
//! slow path, but it needs nothing from the host beyond the global heap.

use super::{Address, MemoryBackend};
use crate::config::BackendKind;
use crate::{Error, Result};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct RegionTable {
    slots: Vec<Option<Box<[u8]>>>,
    free_slots: Vec<usize>,
}

impl RegionTable {
    fn slot_mut(&mut self, addr: Address) -> Result<&mut [u8]> {
        let slot = addr
            .as_usize()
            .checked_sub(1)
            .ok_or_else(|| Error::invalid_argument("null region address"))?;
        match self.slots.get_mut(slot) {
            Some(Some(region)) => Ok(region),
            _ => Err(Error::invalid_argument(format!(
                "unknown region {:#x}",
                addr.as_usize()
            ))),
        }
    }

    fn range_mut(&mut self, addr: Address, off: usize, len: usize) -> Result<&mut [u8]> {
        let region = self.slot_mut(addr)?;
        let size = region.len();
        off.checked_add(len)
            .and_then(|end| region.get_mut(off..end))
            .ok_or_else(|| Error::bounds(off, len, size))
    }
}

/// Backend that keeps every region in a locked handle table.
///
/// Misuse of an address (null, freed, or out of range) is reported through
/// the log and a debug assertion rather than touching memory.
#[derive(Debug, Default)]
pub(crate) struct NativeBackend {
    table: Mutex<RegionTable>,
}

impl NativeBackend {
    /// Creates an empty handle table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of regions currently allocated.
    pub fn live_regions(&self) -> usize {
        let table = self.table.lock();
        table.slots.len() - table.free_slots.len()
    }
}

// SAFETY: boxed slices never move while they sit in the table, so the
// pointer returned by `ptr` stays valid until `free` removes the slot.
unsafe impl MemoryBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn alloc(&self, len: usize) -> Result<Address> {
        if len == 0 {
            return Err(Error::invalid_argument("cannot allocate an empty region"));
        }
        let mut region = Vec::new();
        region
            .try_reserve_exact(len)
            .map_err(|_| Error::AllocationFailure { requested: len })?;
        region.resize(len, 0u8);

        let mut table = self.table.lock();
        let slot = match table.free_slots.pop() {
            Some(slot) => {
                table.slots[slot] = Some(region.into_boxed_slice());
                slot
            }
            None => {
                table.slots.push(Some(region.into_boxed_slice()));
                table.slots.len() - 1
            }
        };
        Ok(Address::from_raw(slot + 1))
    }

    unsafe fn free(&self, addr: Address, _len: usize) {
        let Some(slot) = addr.as_usize().checked_sub(1) else {
            return;
        };
        let mut table = self.table.lock();
        if let Some(entry) = table.slots.get_mut(slot) {
            if entry.take().is_some() {
                table.free_slots.push(slot);
            }
        }
    }

    unsafe fn ptr(&self, addr: Address) -> *mut u8 {
        match self.table.lock().slot_mut(addr) {
            Ok(region) => region.as_mut_ptr(),
            Err(err) => {
                log::error!("Native backend pointer lookup failed: {}", err);
                debug_assert!(false, "{}", err);
                std::ptr::null_mut()
            }
        }
    }

    unsafe fn read(&self, addr: Address, off: usize, dst: &mut [u8]) {
        match self.table.lock().range_mut(addr, off, dst.len()) {
            Ok(region) => dst.copy_from_slice(region),
            Err(err) => {
                log::error!("Native backend read failed: {}", err);
                debug_assert!(false, "{}", err);
                dst.fill(0);
            }
        }
    }

    unsafe fn write(&self, addr: Address, off: usize, src: &[u8]) {
        match self.table.lock().range_mut(addr, off, src.len()) {
            Ok(region) => region.copy_from_slice(src),
            Err(err) => {
                log::error!("Native backend write failed: {}", err);
                debug_assert!(false, "{}", err);
            }
        }
    }
}
