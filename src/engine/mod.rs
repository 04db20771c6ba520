//! # Storage Engine
//!
//! The codec never stores anything itself. It produces byte keys whose
//! lexicographic order is the application order and hands them to an
//! ordered key/value engine through [`StorageEngine`].
//!
//! [`MemEngine`] is an in-memory implementation over a concurrent skiplist,
//! used by the tests, benches and demo.

mod mem;

pub use mem::{MemEngine, MemEngineIterator};

use crate::write_batch::WriteBatch;
use crate::Result;
use bytes::Bytes;

/// An ordered byte-keyed store.
///
/// Keys compare bytewise. Implementations must be safe to share between
/// threads.
pub trait StorageEngine: Send + Sync {
    /// Inserts or replaces a key.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Looks up a key.
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    /// Removes a key; returns whether it was present.
    fn remove(&self, key: &[u8]) -> Result<bool>;

    /// Opens a cursor. It starts unpositioned; call a `seek*` method first.
    fn iter(&self) -> Box<dyn EngineIterator + '_>;

    /// Applies every operation of `batch` in order.
    fn write(&self, batch: WriteBatch) -> Result<()>;
}

/// Bidirectional cursor over an engine.
pub trait EngineIterator {
    /// Returns true while the cursor is on an entry.
    fn valid(&self) -> bool;

    /// Positions at the first key `>= target`.
    fn seek(&mut self, target: &[u8]);

    /// Positions at the smallest key.
    fn seek_to_first(&mut self);

    /// Positions at the largest key.
    fn seek_to_last(&mut self);

    /// Advances to the next key.
    fn next(&mut self);

    /// Steps back to the previous key.
    fn prev(&mut self);

    /// Current key. Empty when not valid.
    fn key(&self) -> &[u8];

    /// Current value. Empty when not valid.
    fn value(&self) -> &[u8];
}
