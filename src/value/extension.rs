//! Caller-defined value kinds and encode/decode hooks.

use super::{tags, Value};
use crate::buffer::ByteSink;
use crate::cursor::Reader;
use crate::varint;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Handler for a tag at or above [`tags::EXTENSION_BASE`].
///
/// Handlers are offered every value before the built-in encoders, in
/// ascending code order. A handler that claims a value must write its own
/// tag byte.
pub trait ValueExtension: Send + Sync {
    /// Encodes `value` if this handler owns it. Returns `false` to pass.
    fn encode(&self, out: &mut dyn ByteSink, value: &Value) -> Result<bool>;

    /// Decodes the payload that follows `tag`. Returning `None` reports the
    /// tag as unknown.
    fn decode(&self, tag: u8, reader: &mut Reader<'_>) -> Result<Option<Value>>;
}

/// Transformations applied around the codec.
pub trait ValueHooks: Send + Sync {
    /// Runs before a value (and each nested value) is encoded.
    fn before_encode<'a>(&self, value: &'a Value) -> Cow<'a, Value> {
        Cow::Borrowed(value)
    }

    /// Runs on every decoded value, innermost first.
    fn after_decode(&self, value: Value) -> Value {
        value
    }
}

pub(crate) type ExtensionTable = BTreeMap<u8, Arc<dyn ValueExtension>>;

/// Code-keyed registry of extension handlers.
///
/// Readers take a snapshot of the table, so registering a handler while a
/// decode runs never blocks or changes that decode.
#[derive(Default)]
pub struct ExtensionRegistry {
    table: RwLock<Arc<ExtensionTable>>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` under `code`, returning the one it replaced.
    pub fn register(
        &self,
        code: u8,
        handler: Arc<dyn ValueExtension>,
    ) -> Result<Option<Arc<dyn ValueExtension>>> {
        if code < tags::EXTENSION_BASE {
            return Err(Error::invalid_argument(format!(
                "extension code {} is reserved; codes start at {}",
                code,
                tags::EXTENSION_BASE
            )));
        }
        let mut table = self.table.write();
        let mut next = ExtensionTable::clone(&table);
        let previous = next.insert(code, handler);
        *table = Arc::new(next);
        Ok(previous)
    }

    /// Removes the handler for `code`.
    pub fn unregister(&self, code: u8) -> bool {
        let mut table = self.table.write();
        if !table.contains_key(&code) {
            return false;
        }
        let mut next = ExtensionTable::clone(&table);
        next.remove(&code);
        *table = Arc::new(next);
        true
    }

    /// Codes with a registered handler, ascending.
    pub fn codes(&self) -> Vec<u8> {
        self.table.read().keys().copied().collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    pub(crate) fn snapshot(&self) -> Arc<ExtensionTable> {
        Arc::clone(&self.table.read())
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry").field("codes", &self.codes()).finish()
    }
}

/// Stores [`Value::Extension`] payloads for one code as
/// `[code][len: v32][data]`.
#[derive(Debug, Clone, Copy)]
pub struct RawExtension {
    code: u8,
}

impl RawExtension {
    /// Creates a handler for `code`.
    pub fn new(code: u8) -> Self {
        Self { code }
    }

    /// The handled code.
    pub fn code(&self) -> u8 {
        self.code
    }
}

impl ValueExtension for RawExtension {
    fn encode(&self, out: &mut dyn ByteSink, value: &Value) -> Result<bool> {
        match value {
            Value::Extension { code, data } if *code == self.code => {
                out.put_u8(self.code)?;
                varint::write_len(out, data.len())?;
                out.put(data)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn decode(&self, tag: u8, reader: &mut Reader<'_>) -> Result<Option<Value>> {
        if tag != self.code {
            return Ok(None);
        }
        let len = varint::read_len(reader)?;
        let data = reader.read_bytes(len)?.to_vec();
        Ok(Some(Value::Extension { code: tag, data }))
    }
}
