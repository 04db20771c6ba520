//! Typed access to a [`StorageEngine`] through a [`Codec`].

use crate::engine::StorageEngine;
use crate::key::{KeyLayout, KeyPart, Shape};
use crate::value::Value;
use crate::write_batch::WriteBatch;
use crate::{Codec, Error, Result};
use std::sync::Arc;

/// A decoded engine entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// First key component.
    pub first: KeyPart,
    /// Second key component (`Null` for single-component layouts).
    pub second: KeyPart,
    /// Stored value.
    pub value: Value,
}

/// Binds a codec, one key layout and an engine.
///
/// Every call checks a buffer pool out of the codec's pool cache, so a
/// `Store` can be shared between threads.
///
/// # Example
///
/// ```rust
/// use levelcodec::{Codec, KeyLayout, KeyPart, MemEngine, Options, Store, Value};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), levelcodec::Error> {
/// let codec = Arc::new(Codec::new(Options::default())?);
/// let store = Store::new(codec, KeyLayout::StrN32, MemEngine::new());
///
/// store.put(&"user".into(), &7.into(), &Value::from("ada"))?;
/// assert_eq!(store.get(&"user".into(), &7.into())?, Some(Value::from("ada")));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Store<E: StorageEngine> {
    codec: Arc<Codec>,
    layout: KeyLayout,
    engine: E,
}

impl<E: StorageEngine> Store<E> {
    /// Creates a store over `engine`.
    pub fn new(codec: Arc<Codec>, layout: KeyLayout, engine: E) -> Self {
        Self { codec, layout, engine }
    }

    /// The shared codec.
    pub fn codec(&self) -> &Arc<Codec> {
        &self.codec
    }

    /// The key layout of every entry.
    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Encodes and stores one entry.
    pub fn put(&self, first: &KeyPart, second: &KeyPart, value: &Value) -> Result<()> {
        let mut ctx = self.codec.pool_cache().checkout();
        let (key, value) = self.codec.encode_entry(&mut ctx, self.layout, first, second, value)?;
        self.engine.put(key.as_slice(), value.as_slice())
    }

    /// Looks up and decodes one entry.
    pub fn get(&self, first: &KeyPart, second: &KeyPart) -> Result<Option<Value>> {
        let mut ctx = self.codec.pool_cache().checkout();
        let key = self.codec.key_buffer(&mut ctx, self.layout, first, second)?;
        match self.engine.get(key.as_slice())? {
            Some(bytes) => Ok(Some(self.codec.decode_value(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Removes one entry; returns whether it existed.
    pub fn remove(&self, first: &KeyPart, second: &KeyPart) -> Result<bool> {
        let mut ctx = self.codec.pool_cache().checkout();
        let key = self.codec.key_buffer(&mut ctx, self.layout, first, second)?;
        self.engine.remove(key.as_slice())
    }

    /// Decodes every entry at or after `(first, second)` in engine order.
    pub fn scan_from(&self, first: &KeyPart, second: &KeyPart) -> Result<Vec<Record>> {
        let start = {
            let mut ctx = self.codec.pool_cache().checkout();
            self.codec.key_buffer(&mut ctx, self.layout, first, second)?.to_vec()
        };
        self.collect(&start, |_| true)
    }

    /// Decodes every entry whose first component equals `first`.
    ///
    /// Only two-component layouts have a separable first component.
    pub fn scan_prefix(&self, first: &KeyPart) -> Result<Vec<Record>> {
        let Shape::Pair(_, second_kind) = self.layout.shape() else {
            return Err(Error::invalid_argument(format!(
                "{:?} has no leading component to scan by",
                self.layout
            )));
        };
        let mut prefix = self.codec.key_codec().to_vec(self.layout, first, &KeyPart::Null)?;
        // a null fixed-width second component still occupies its width
        let width = second_kind.fixed_width().unwrap_or(0);
        prefix.truncate(prefix.len() - width);
        self.collect(&prefix, |key| key.starts_with(&prefix))
    }

    /// Decodes every entry.
    pub fn entries(&self) -> Result<Vec<Record>> {
        self.collect(&[], |_| true)
    }

    fn collect(&self, start: &[u8], mut keep: impl FnMut(&[u8]) -> bool) -> Result<Vec<Record>> {
        let mut iter = self.engine.iter();
        iter.seek(start);
        let mut records = Vec::new();
        while iter.valid() && keep(iter.key()) {
            let (first, second) = self.codec.decode_key(self.layout, iter.key())?;
            let value = self.codec.decode_value(iter.value())?;
            records.push(Record { first, second, value });
            iter.next();
        }
        Ok(records)
    }

    /// Encodes an entry into `batch` without touching the engine.
    pub fn batch_put(
        &self,
        batch: &mut WriteBatch,
        first: &KeyPart,
        second: &KeyPart,
        value: &Value,
    ) -> Result<()> {
        let mut ctx = self.codec.pool_cache().checkout();
        batch.put_value(&self.codec, &mut ctx, self.layout, first, second, value)
    }

    /// Encodes a key deletion into `batch`.
    pub fn batch_remove(&self, batch: &mut WriteBatch, first: &KeyPart, second: &KeyPart) -> Result<()> {
        let mut ctx = self.codec.pool_cache().checkout();
        batch.delete_key(&self.codec, &mut ctx, self.layout, first, second)
    }

    /// Applies a batch to the engine.
    pub fn apply(&self, batch: WriteBatch) -> Result<()> {
        self.engine.write(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemEngine, Options};

    fn store(layout: KeyLayout) -> Store<MemEngine> {
        let codec = Arc::new(Codec::new(Options::default()).unwrap());
        Store::new(codec, layout, MemEngine::new())
    }

    #[test]
    fn test_put_get_remove() {
        let store = store(KeyLayout::N64);
        store.put(&KeyPart::I64(5), &KeyPart::Null, &Value::from("five")).unwrap();
        assert_eq!(store.get(&KeyPart::I64(5), &KeyPart::Null).unwrap(), Some(Value::from("five")));
        assert_eq!(store.get(&KeyPart::I64(6), &KeyPart::Null).unwrap(), None);
        assert!(store.remove(&KeyPart::I64(5), &KeyPart::Null).unwrap());
        assert!(store.engine().is_empty());
    }

    #[test]
    fn test_scan_from_follows_numeric_order() {
        let store = store(KeyLayout::N32);
        for n in [10, -3, 0, 7, -100] {
            store.put(&KeyPart::I32(n), &KeyPart::Null, &Value::I32(n)).unwrap();
        }
        let keys: Vec<_> = store
            .scan_from(&KeyPart::I32(-3), &KeyPart::Null)
            .unwrap()
            .into_iter()
            .map(|r| r.first)
            .collect();
        assert_eq!(keys, vec![KeyPart::I32(-3), KeyPart::I32(0), KeyPart::I32(7), KeyPart::I32(10)]);
    }

    #[test]
    fn test_scan_prefix_pair_layouts() {
        let store = store(KeyLayout::N32N64);
        for (a, b) in [(1, 5i64), (2, -1), (1, -9), (3, 0), (1, 0)] {
            store.put(&KeyPart::I32(a), &KeyPart::I64(b), &Value::Null).unwrap();
        }
        let seconds: Vec<_> =
            store.scan_prefix(&KeyPart::I32(1)).unwrap().into_iter().map(|r| r.second).collect();
        assert_eq!(seconds, vec![KeyPart::I64(-9), KeyPart::I64(0), KeyPart::I64(5)]);

        let single = self::store(KeyLayout::Str);
        assert!(matches!(single.scan_prefix(&KeyPart::from("x")), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_batch_apply() {
        let store = store(KeyLayout::StrStr);
        store.put(&"a".into(), &"old".into(), &Value::Null).unwrap();

        let mut batch = WriteBatch::new();
        store.batch_put(&mut batch, &"a".into(), &"x".into(), &Value::I64(1)).unwrap();
        store.batch_put(&mut batch, &"b".into(), &"y".into(), &Value::I64(2)).unwrap();
        store.batch_remove(&mut batch, &"a".into(), &"old".into()).unwrap();
        assert_eq!(store.engine().len(), 1);
        store.apply(batch).unwrap();

        let records = store.entries().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, Value::I64(1));
        assert_eq!(records[1].first, KeyPart::from("b"));
    }

    #[test]
    fn test_pool_cache_reused_across_calls() {
        let store = store(KeyLayout::Str);
        store.put(&"k".into(), &KeyPart::Null, &Value::Null).unwrap();
        store.get(&"k".into(), &KeyPart::Null).unwrap();
        let stats = store.codec().pool_cache().stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }
}
