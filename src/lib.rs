//! # levelcodec - Order-Preserving Codecs for Ordered Key-Value Engines
//!
//! levelcodec turns typed records into the byte strings an ordered,
//! byte-comparing key/value engine stores, and back.
//!
//! ## Architecture
//!
//! - **Memory backends**: raw regions behind an opaque [`Backend`] handle,
//!   with a direct and a handle-table implementation
//! - **Native buffers**: growable, reusable regions with a write position
//! - **Buffer pools**: one key buffer and one value buffer per context
//! - **Varint codec**: 1-5 byte (32-bit) and 1-9 byte (64-bit) packing
//! - **Value codec**: a recursive type-tagged format with extensions
//! - **Key codec**: composite keys whose byte order is their typed order
//! - **Engine seam**: the [`StorageEngine`] trait and an in-memory engine
//!
//! ## Example Usage
//!
//! ```rust
//! use levelcodec::{Codec, KeyLayout, KeyPart, Options, Value};
//!
//! # fn main() -> Result<(), levelcodec::Error> {
//! let codec = Codec::new(Options::default())?;
//! let mut pool = codec.pool();
//!
//! let key = codec
//!     .key_buffer(&mut pool, KeyLayout::N64Str, &KeyPart::I64(-42), &KeyPart::from("café"))?
//!     .to_vec();
//! let (first, second) = codec.decode_key(KeyLayout::N64Str, &key)?;
//! assert_eq!(first, KeyPart::I64(-42));
//! assert_eq!(second, KeyPart::from("café"));
//!
//! let value = Value::map(vec![("a", Value::I32(1))]);
//! let bytes = codec.value_buffer(&mut pool, &value)?.to_vec();
//! assert_eq!(codec.decode_value(&bytes)?, value);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod buffer;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod key;
pub mod memory;
pub mod pool;
pub mod store;
pub mod value;
pub mod varint;
pub mod write_batch;

// Re-exports
pub use buffer::{ByteSink, NativeBuffer};
pub use config::{BackendKind, Options, TextEncoding};
pub use engine::{EngineIterator, MemEngine, StorageEngine};
pub use error::{Error, Result};
pub use key::{KeyCodec, KeyLayout, KeyPart, TwoKey};
pub use memory::{select_backend, Backend};
pub use pool::{BufferPool, PoolCache, PooledContext};
pub use store::Store;
pub use value::{Value, ValueCodec, ValueExtension, ValueHooks};
pub use write_batch::{WriteBatch, WriteOp};

use std::sync::Arc;

/// Entry point tying the backend, key codec and value codec together.
///
/// # Thread Safety
///
/// `Codec` is `Send + Sync`; share it with `Arc<Codec>`. Buffers are never
/// shared: every context encodes through its own [`BufferPool`].
#[derive(Debug)]
pub struct Codec {
    options: Options,
    backend: Backend,
    keys: KeyCodec,
    values: ValueCodec,
    pools: PoolCache,
}

impl Codec {
    /// Validates `options`, selects the memory backend and builds the codecs.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a size or limit in `options` is zero.
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        let backend = select_backend(options.backend);
        log::info!(
            "Codec ready: backend={:?}, text={:?}, shrink_threshold={}, max_nesting={}",
            backend.kind(),
            options.text_encoding,
            options.shrink_threshold,
            options.max_nesting
        );
        Ok(Self {
            keys: KeyCodec::new(options.text_encoding),
            values: ValueCodec::new(&options),
            pools: PoolCache::new(backend.clone(), options.clone()),
            backend,
            options,
        })
    }

    /// The options this codec was built with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The selected memory backend.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// The key codec.
    pub fn key_codec(&self) -> &KeyCodec {
        &self.keys
    }

    /// The value codec.
    pub fn value_codec(&self) -> &ValueCodec {
        &self.values
    }

    /// Shared cache of idle pools.
    pub fn pool_cache(&self) -> &PoolCache {
        &self.pools
    }

    /// Creates a new, unbound buffer pool for one context.
    pub fn pool(&self) -> BufferPool {
        BufferPool::new(self.backend.clone(), self.options.clone())
    }

    /// Encodes a key into the pool's key buffer.
    ///
    /// Single-component, multi and free layouts take `KeyPart::Null` as
    /// `second`.
    pub fn key_buffer<'p>(
        &self,
        pool: &'p mut BufferPool,
        layout: KeyLayout,
        first: &KeyPart,
        second: &KeyPart,
    ) -> Result<&'p NativeBuffer> {
        let buf = pool.key_buffer();
        self.keys.encode_into(buf, layout, first, second)?;
        Ok(buf)
    }

    /// Encodes a value into the pool's value buffer.
    pub fn value_buffer<'p>(
        &self,
        pool: &'p mut BufferPool,
        value: &Value,
    ) -> Result<&'p NativeBuffer> {
        let buf = pool.value_buffer();
        self.values.encode_into(buf, value)?;
        Ok(buf)
    }

    /// Encodes a key and a value into the pool's two buffers.
    pub fn encode_entry<'p>(
        &self,
        pool: &'p mut BufferPool,
        layout: KeyLayout,
        first: &KeyPart,
        second: &KeyPart,
        value: &Value,
    ) -> Result<(&'p NativeBuffer, &'p NativeBuffer)> {
        let (key_buf, value_buf) = pool.buffers();
        self.keys.encode_into(key_buf, layout, first, second)?;
        self.values.encode_into(value_buf, value)?;
        Ok((key_buf, value_buf))
    }

    /// Decodes a key of `layout`.
    pub fn decode_key(&self, layout: KeyLayout, bytes: &[u8]) -> Result<(KeyPart, KeyPart)> {
        self.keys.decode(layout, bytes)
    }

    /// Decodes one value spanning all of `bytes`.
    pub fn decode_value(&self, bytes: &[u8]) -> Result<Value> {
        self.values.decode(bytes)
    }

    /// Registers a handler for an extension code (at least 100).
    pub fn register_extension(&self, code: u8, handler: Arc<dyn ValueExtension>) -> Result<()> {
        self.values.register_extension(code, handler)
    }

    /// Installs or clears the value hooks.
    pub fn set_hooks(&self, hooks: Option<Arc<dyn ValueHooks>>) {
        self.values.set_hooks(hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_rejects_invalid_options() {
        let result = Codec::new(Options::new().max_nesting(0));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_codec_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Codec>();
        assert_send_sync::<Store<MemEngine>>();
    }

    #[test]
    fn test_buffers_are_reused() {
        let codec = Codec::new(Options::default()).unwrap();
        let mut pool = codec.pool();
        assert!(!pool.is_bound());

        let first = codec.key_buffer(&mut pool, KeyLayout::N32, &KeyPart::I32(1), &KeyPart::Null).unwrap();
        let address = first.address();
        assert_eq!(first.as_slice(), &[0x80, 0, 0, 1]);

        let second = codec.key_buffer(&mut pool, KeyLayout::N32, &KeyPart::I32(2), &KeyPart::Null).unwrap();
        assert_eq!(second.address(), address);
        assert_eq!(second.as_slice(), &[0x80, 0, 0, 2]);
    }

    #[test]
    fn test_encode_entry_fills_both_buffers() {
        let codec = Codec::new(Options::default()).unwrap();
        let mut pool = codec.pool();
        let (key, value) = codec
            .encode_entry(&mut pool, KeyLayout::Str, &KeyPart::from("k"), &KeyPart::Null, &Value::Bool(true))
            .unwrap();
        assert_eq!(key.as_slice(), b"k");
        assert_eq!(value.as_slice(), &[2, 1]);
    }

    #[test]
    fn test_failed_value_encode_reports_error() {
        let codec = Codec::new(Options::default()).unwrap();
        let mut pool = codec.pool();
        let ext = Value::Extension { code: 130, data: vec![] };
        assert!(codec.value_buffer(&mut pool, &ext).is_err());
        codec.register_extension(130, Arc::new(value::RawExtension::new(130))).unwrap();
        let bytes = codec.value_buffer(&mut pool, &ext).unwrap().to_vec();
        assert_eq!(codec.decode_value(&bytes).unwrap(), ext);
    }
}
