//! Skiplist-backed in-memory engine.

use super::{EngineIterator, StorageEngine};
use crate::write_batch::{WriteBatch, WriteOp};
use crate::Result;
use bytes::Bytes;
use crossbeam_skiplist::SkipMap;
use parking_lot::Mutex;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-entry bookkeeping added to `approximate_size`.
const ENTRY_OVERHEAD: usize = 16;

/// In-memory ordered engine.
///
/// Reads and single writes are lock-free. Batches are serialized against
/// each other so two batches never interleave.
#[derive(Debug, Default)]
pub struct MemEngine {
    data: SkipMap<Bytes, Bytes>,
    size: AtomicUsize,
    batch_lock: Mutex<()>,
}

impl MemEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no key is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Approximate bytes held by keys and values.
    pub fn approximate_size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    fn insert(&self, key: &[u8], value: &[u8]) {
        let added = key.len() + value.len() + ENTRY_OVERHEAD;
        let previous = self.data.get(key).map(|e| e.key().len() + e.value().len() + ENTRY_OVERHEAD);
        self.data.insert(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
        self.size.fetch_add(added, Ordering::Relaxed);
        if let Some(previous) = previous {
            self.size.fetch_sub(previous, Ordering::Relaxed);
        }
    }

    fn delete(&self, key: &[u8]) -> bool {
        match self.data.remove(key) {
            Some(entry) => {
                let freed = entry.key().len() + entry.value().len() + ENTRY_OVERHEAD;
                self.size.fetch_sub(freed, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

impl StorageEngine for MemEngine {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    fn remove(&self, key: &[u8]) -> Result<bool> {
        Ok(self.delete(key))
    }

    fn iter(&self) -> Box<dyn EngineIterator + '_> {
        Box::new(MemEngineIterator { data: &self.data, current: None })
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let _guard = self.batch_lock.lock();
        for op in batch.iter() {
            match op {
                WriteOp::Put { key, value } => self.insert(key, value),
                WriteOp::Delete { key } => {
                    self.delete(key);
                }
            }
        }
        Ok(())
    }
}

/// Cursor over a [`MemEngine`].
///
/// The cursor remembers the current key and re-seeks the skiplist on every
/// step, so concurrent inserts and removals never invalidate it.
pub struct MemEngineIterator<'a> {
    data: &'a SkipMap<Bytes, Bytes>,
    current: Option<(Bytes, Bytes)>,
}

impl MemEngineIterator<'_> {
    fn load(&mut self, entry: Option<crossbeam_skiplist::map::Entry<'_, Bytes, Bytes>>) {
        self.current = entry.map(|e| (e.key().clone(), e.value().clone()));
    }
}

impl EngineIterator for MemEngineIterator<'_> {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn seek(&mut self, target: &[u8]) {
        let entry = self.data.lower_bound(Bound::Included(target));
        self.load(entry);
    }

    fn seek_to_first(&mut self) {
        let entry = self.data.front();
        self.load(entry);
    }

    fn seek_to_last(&mut self) {
        let entry = self.data.back();
        self.load(entry);
    }

    fn next(&mut self) {
        let Some((key, _)) = self.current.take() else { return };
        let entry = self.data.lower_bound(Bound::Excluded(&key[..]));
        self.load(entry);
    }

    fn prev(&mut self) {
        let Some((key, _)) = self.current.take() else { return };
        let entry = self.data.upper_bound(Bound::Excluded(&key[..]));
        self.load(entry);
    }

    fn key(&self) -> &[u8] {
        self.current.as_ref().map(|(k, _)| &k[..]).unwrap_or_default()
    }

    fn value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, v)| &v[..]).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(keys: &[&[u8]]) -> MemEngine {
        let engine = MemEngine::new();
        for key in keys {
            engine.put(key, b"v").unwrap();
        }
        engine
    }

    #[test]
    fn test_put_get_remove() {
        let engine = MemEngine::new();
        engine.put(b"k", b"one").unwrap();
        engine.put(b"k", b"two").unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Some(Bytes::from_static(b"two")));
        assert_eq!(engine.len(), 1);
        assert!(engine.remove(b"k").unwrap());
        assert!(!engine.remove(b"k").unwrap());
        assert_eq!(engine.get(b"k").unwrap(), None);
        assert_eq!(engine.approximate_size(), 0);
    }

    #[test]
    fn test_size_tracks_replacement() {
        let engine = MemEngine::new();
        engine.put(b"k", b"12345").unwrap();
        let first = engine.approximate_size();
        engine.put(b"k", b"1").unwrap();
        assert_eq!(engine.approximate_size(), first - 4);
    }

    #[test]
    fn test_iterator_walks_both_ways() {
        let engine = engine_with(&[b"b", b"a", b"d", b"c"]);
        let mut iter = engine.iter();
        assert!(!iter.valid());
        assert!(iter.key().is_empty());

        iter.seek_to_first();
        let mut forward = Vec::new();
        while iter.valid() {
            forward.push(iter.key().to_vec());
            iter.next();
        }
        assert_eq!(forward, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);

        iter.seek_to_last();
        assert_eq!(iter.key(), b"d");
        iter.prev();
        assert_eq!(iter.key(), b"c");
        iter.prev();
        iter.prev();
        iter.prev();
        assert!(!iter.valid());
    }

    #[test]
    fn test_seek_lands_on_lower_bound() {
        let engine = engine_with(&[b"apple", b"banana", b"cherry"]);
        let mut iter = engine.iter();
        iter.seek(b"b");
        assert_eq!(iter.key(), b"banana");
        iter.seek(b"banana");
        assert_eq!(iter.key(), b"banana");
        iter.seek(b"zzz");
        assert!(!iter.valid());
    }

    #[test]
    fn test_batch_write() {
        let engine = engine_with(&[b"gone"]);
        let mut batch = WriteBatch::new();
        batch.put(b"x", b"1");
        batch.put(b"y", b"2");
        batch.delete(b"gone");
        batch.put(b"x", b"3");
        engine.write(batch).unwrap();

        assert_eq!(engine.get(b"x").unwrap(), Some(Bytes::from_static(b"3")));
        assert_eq!(engine.get(b"y").unwrap(), Some(Bytes::from_static(b"2")));
        assert_eq!(engine.get(b"gone").unwrap(), None);
        assert_eq!(engine.len(), 2);
    }
}
