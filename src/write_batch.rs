//! Buffered engine writes.
//!
//! A [`WriteBatch`] collects encoded put and delete operations so that a
//! group of related records reaches the engine in one
//! [`StorageEngine::write`](crate::engine::StorageEngine::write) call.
//!
//! # Example
//!
//! ```rust
//! use levelcodec::{Codec, KeyLayout, KeyPart, MemEngine, Options, StorageEngine, Value, WriteBatch};
//!
//! # fn main() -> Result<(), levelcodec::Error> {
//! let codec = Codec::new(Options::default())?;
//! let mut pool = codec.pool();
//! let mut batch = WriteBatch::new();
//!
//! let none = KeyPart::Null;
//! batch.put_value(&codec, &mut pool, KeyLayout::N32, &1.into(), &none, &Value::from("one"))?;
//! batch.put_value(&codec, &mut pool, KeyLayout::N32, &2.into(), &none, &Value::from("two"))?;
//! batch.delete_key(&codec, &mut pool, KeyLayout::N32, &3.into(), &none)?;
//!
//! let engine = MemEngine::new();
//! engine.write(batch)?;
//! assert_eq!(engine.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::key::{KeyLayout, KeyPart};
use crate::pool::BufferPool;
use crate::value::Value;
use crate::{Codec, Result};
use std::collections::VecDeque;

/// One buffered operation on encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or replace.
    Put {
        /// Encoded key.
        key: Vec<u8>,
        /// Encoded value.
        value: Vec<u8>,
    },
    /// Remove.
    Delete {
        /// Encoded key.
        key: Vec<u8>,
    },
}

/// An ordered list of encoded operations.
#[derive(Debug, Default)]
pub struct WriteBatch {
    operations: VecDeque<WriteOp>,
    approximate_size: usize,
}

impl WriteBatch {
    /// Creates an empty batch.
    ///
    /// ```
    /// use levelcodec::WriteBatch;
    ///
    /// let batch = WriteBatch::new();
    /// assert!(batch.is_empty());
    /// ```
    pub fn new() -> Self {
        Self { operations: VecDeque::new(), approximate_size: 0 }
    }

    /// Queues a put of raw encoded bytes.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.approximate_size += key.len() + value.len() + 8;
        self.operations.push_back(WriteOp::Put { key: key.to_vec(), value: value.to_vec() });
    }

    /// Queues a delete of a raw encoded key.
    pub fn delete(&mut self, key: &[u8]) {
        self.approximate_size += key.len() + 4;
        self.operations.push_back(WriteOp::Delete { key: key.to_vec() });
    }

    /// Encodes a key and `value` through `pool`, then queues the put.
    ///
    /// Single-component layouts take `KeyPart::Null` as `second`. Nothing is
    /// queued if either encoding fails.
    pub fn put_value(
        &mut self,
        codec: &Codec,
        pool: &mut BufferPool,
        layout: KeyLayout,
        first: &KeyPart,
        second: &KeyPart,
        value: &Value,
    ) -> Result<()> {
        let (key, value) = codec.encode_entry(pool, layout, first, second, value)?;
        self.put(key.as_slice(), value.as_slice());
        Ok(())
    }

    /// Encodes a key through `pool` and queues its deletion.
    pub fn delete_key(
        &mut self,
        codec: &Codec,
        pool: &mut BufferPool,
        layout: KeyLayout,
        first: &KeyPart,
        second: &KeyPart,
    ) -> Result<()> {
        let key = codec.key_buffer(pool, layout, first, second)?;
        self.delete(key.as_slice());
        Ok(())
    }

    /// Drops every queued operation.
    pub fn clear(&mut self) {
        self.operations.clear();
        self.approximate_size = 0;
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Rough memory footprint of the queued bytes.
    pub fn approximate_size(&self) -> usize {
        self.approximate_size
    }

    /// Queued operations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.operations.iter()
    }
}
