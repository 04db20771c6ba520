//! Tag-dispatched value encoder and decoder.

use super::extension::{ExtensionRegistry, ExtensionTable, ValueExtension, ValueHooks};
use super::{is_canonical_decimal, is_canonical_integer, tags};
use super::{ArrayKey, DateKind, KeyArray, Value, ValueMap, ValueSet};
use crate::buffer::{decode_text, encode_text, ByteSink, NativeBuffer};
use crate::config::{Options, TextEncoding};
use crate::cursor::Reader;
use crate::key::{KeyCodec, KeyLayout, TwoKey};
use crate::varint;
use crate::{Error, Result};
use log::debug;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Encodes [`Value`]s into tagged byte strings and back.
///
/// Extensions and hooks can be changed at any time; every top-level call
/// works against the set that was installed when it started.
pub struct ValueCodec {
    encoding: TextEncoding,
    max_nesting: usize,
    extensions: ExtensionRegistry,
    hooks: RwLock<Option<Arc<dyn ValueHooks>>>,
}

impl ValueCodec {
    /// Creates a codec with the text encoding and nesting limit of `options`.
    pub fn new(options: &Options) -> Self {
        Self {
            encoding: options.text_encoding,
            max_nesting: options.max_nesting,
            extensions: ExtensionRegistry::new(),
            hooks: RwLock::new(None),
        }
    }

    /// Text encoding of string payloads.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Deepest container nesting the decoder accepts.
    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }

    /// The extension registry.
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Registers a handler for `code` (at least 100).
    pub fn register_extension(&self, code: u8, handler: Arc<dyn ValueExtension>) -> Result<()> {
        if self.extensions.register(code, handler)?.is_some() {
            debug!("Replaced value extension {}", code);
        } else {
            debug!("Registered value extension {}", code);
        }
        Ok(())
    }

    /// Installs or clears the encode/decode hooks.
    pub fn set_hooks(&self, hooks: Option<Arc<dyn ValueHooks>>) {
        *self.hooks.write() = hooks;
    }

    fn session(&self) -> Session {
        Session {
            encoding: self.encoding,
            max_nesting: self.max_nesting,
            extensions: self.extensions.snapshot(),
            hooks: self.hooks.read().clone(),
        }
    }

    /// Appends the encoding of `value` to `out`.
    pub fn encode(&self, out: &mut dyn ByteSink, value: &Value) -> Result<()> {
        self.session().encode_value(out, value)
    }

    /// Writes `value` into `buf`, replacing its contents.
    pub fn encode_into(&self, buf: &mut NativeBuffer, value: &Value) -> Result<()> {
        buf.set_position(0)?;
        self.encode(buf, value)
    }

    /// Encodes `value` into a fresh vector.
    pub fn to_vec(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out, value)?;
        Ok(out)
    }

    /// Decodes exactly one value spanning all of `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let (value, end) = self.decode_at(bytes, 0, bytes.len())?;
        if end != bytes.len() {
            return Err(Error::malformed(format!(
                "{} trailing bytes after value",
                bytes.len() - end
            )));
        }
        Ok(value)
    }

    /// Decodes one value starting at `off` without reading past `limit`.
    /// Returns the value and the offset just after it.
    pub fn decode_at(&self, bytes: &[u8], off: usize, limit: usize) -> Result<(Value, usize)> {
        let mut reader = Reader::with_limit(bytes, off, limit)?;
        let value = self.session().decode_value(&mut reader, 0)?;
        Ok((value, reader.position()))
    }

    /// Decodes the written contents of `buf`.
    pub fn decode_buffer(&self, buf: &NativeBuffer) -> Result<Value> {
        self.decode(buf.as_slice())
    }
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::new(&Options::default())
    }
}

impl fmt::Debug for ValueCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCodec")
            .field("encoding", &self.encoding)
            .field("max_nesting", &self.max_nesting)
            .field("extensions", &self.extensions)
            .field("hooks", &self.hooks.read().is_some())
            .finish()
    }
}

/// State pinned for the duration of one top-level encode or decode.
struct Session {
    encoding: TextEncoding,
    max_nesting: usize,
    extensions: Arc<ExtensionTable>,
    hooks: Option<Arc<dyn ValueHooks>>,
}

impl Session {
    fn encode_value(&self, out: &mut dyn ByteSink, value: &Value) -> Result<()> {
        let value = match &self.hooks {
            Some(hooks) => hooks.before_encode(value),
            None => Cow::Borrowed(value),
        };
        let value = value.as_ref();

        for handler in self.extensions.values() {
            if handler.encode(out, value)? {
                return Ok(());
            }
        }
        self.encode_builtin(out, value)
    }

    fn encode_builtin(&self, out: &mut dyn ByteSink, value: &Value) -> Result<()> {
        if let Value::Extension { code, .. } = value {
            return Err(Error::invalid_argument(format!(
                "no extension handler claims code {}",
                code
            )));
        }

        out.put_u8(value.tag())?;
        match value {
            Value::Null => {}
            Value::Str(s) => self.put_text(out, s)?,
            Value::Bool(b) => out.put_u8(*b as u8)?,
            Value::Char(c) => out.put(&char_unit(*c)?.to_be_bytes())?,
            Value::I8(v) => out.put_u8(*v as u8)?,
            Value::I16(v) => out.put(&v.to_be_bytes())?,
            Value::I32(v) | Value::AtomicI32(v) => varint::write32(out, *v)?,
            Value::I64(v) | Value::AtomicI64(v) => varint::write64(out, *v)?,
            Value::F32(v) => varint::write32(out, v.to_bits() as i32)?,
            Value::F64(v) => varint::write64(out, v.to_bits() as i64)?,
            Value::Decimal(s) => {
                if !is_canonical_decimal(s) {
                    return Err(Error::malformed(format!("'{}' is not a decimal", s)));
                }
                self.put_text(out, s)?;
            }
            Value::BigInt(s) => {
                if !is_canonical_integer(s) {
                    return Err(Error::malformed(format!("'{}' is not an integer", s)));
                }
                self.put_text(out, s)?;
            }
            Value::Date(kind, millis) => {
                out.put_u8(*kind as u8)?;
                varint::write64(out, *millis)?;
            }
            Value::BoolArray(items) => {
                varint::write_len(out, items.len())?;
                for b in items {
                    out.put_u8(*b as u8)?;
                }
            }
            Value::Bytes(bytes) => {
                varint::write_len(out, bytes.len())?;
                out.put(bytes)?;
            }
            Value::CharArray(items) => {
                varint::write_len(out, items.len())?;
                for c in items {
                    out.put(&char_unit(*c)?.to_be_bytes())?;
                }
            }
            Value::ShortArray(items) => {
                varint::write_len(out, items.len())?;
                for v in items {
                    out.put(&v.to_be_bytes())?;
                }
            }
            Value::IntArray(items) => {
                varint::write_len(out, items.len())?;
                for v in items {
                    varint::write32(out, *v)?;
                }
            }
            Value::LongArray(items) => {
                varint::write_len(out, items.len())?;
                for v in items {
                    varint::write64(out, *v)?;
                }
            }
            Value::FloatArray(items) => {
                varint::write_len(out, items.len())?;
                for v in items {
                    varint::write32(out, v.to_bits() as i32)?;
                }
            }
            Value::DoubleArray(items) => {
                varint::write_len(out, items.len())?;
                for v in items {
                    varint::write64(out, v.to_bits() as i64)?;
                }
            }
            Value::StringArray(items) => {
                varint::write_len(out, items.len())?;
                for s in items {
                    self.put_text(out, s)?;
                }
            }
            Value::Array { type_name, items } => {
                self.put_text(out, type_name)?;
                varint::write_len(out, items.len())?;
                for item in items {
                    self.encode_value(out, item)?;
                }
            }
            Value::List(items) => {
                varint::write_len(out, items.len())?;
                for item in items {
                    self.encode_value(out, item)?;
                }
            }
            Value::Map(map) => {
                varint::write_len(out, map.len())?;
                for (k, v) in map.iter() {
                    self.encode_value(out, k)?;
                    self.encode_value(out, v)?;
                }
            }
            Value::Set(set) => {
                varint::write_len(out, set.len())?;
                for item in set.iter() {
                    self.encode_value(out, item)?;
                }
            }
            Value::KeyArray(array) => {
                varint::write_len(out, array.len())?;
                for (k, v) in array.iter() {
                    self.encode_value(out, &k.to_value())?;
                    self.encode_value(out, v)?;
                }
            }
            Value::TwoKey(key) => {
                out.put_u8(key.layout().as_u8())?;
                let bytes =
                    KeyCodec::new(self.encoding).to_vec(key.layout(), key.first(), key.second())?;
                varint::write_len(out, bytes.len())?;
                out.put(&bytes)?;
            }
            Value::Opaque(bytes) => {
                varint::write_len(out, bytes.len())?;
                out.put(bytes)?;
            }
            Value::Extension { .. } => {}
        }
        Ok(())
    }

    fn put_text(&self, out: &mut dyn ByteSink, s: &str) -> Result<()> {
        let bytes = encode_text(s, self.encoding);
        varint::write_len(out, bytes.len())?;
        out.put(&bytes)
    }

    fn read_text(&self, reader: &mut Reader<'_>) -> Result<String> {
        let len = varint::read_len(reader)?;
        decode_text(reader.read_bytes(len)?, self.encoding)
    }

    fn decode_value(&self, reader: &mut Reader<'_>, depth: usize) -> Result<Value> {
        if depth > self.max_nesting {
            return Err(Error::malformed(format!(
                "value nesting exceeds {} levels",
                self.max_nesting
            )));
        }
        let offset = reader.position();
        let tag = reader.read_u8()?;
        let value = match tag {
            tags::NULL => Value::Null,
            tags::STRING => Value::Str(self.read_text(reader)?),
            tags::BOOL => Value::Bool(reader.read_u8()? == 1),
            tags::CHAR => Value::Char(unit_char(reader.read_u16()?)?),
            tags::I8 => Value::I8(reader.read_u8()? as i8),
            tags::I16 => Value::I16(reader.read_i16()?),
            tags::I32 => Value::I32(varint::unpack32(reader)?),
            tags::I64 => Value::I64(varint::unpack64(reader)?),
            tags::F32 => Value::F32(f32::from_bits(varint::unpack32(reader)? as u32)),
            tags::F64 => Value::F64(f64::from_bits(varint::unpack64(reader)? as u64)),
            tags::ATOMIC_I32 => Value::AtomicI32(varint::unpack32(reader)?),
            tags::ATOMIC_I64 => Value::AtomicI64(varint::unpack64(reader)?),
            tags::DECIMAL => {
                let s = self.read_text(reader)?;
                if !is_canonical_decimal(&s) {
                    return Err(Error::malformed(format!("'{}' is not a decimal", s)));
                }
                Value::Decimal(s)
            }
            tags::BIG_INTEGER => {
                let s = self.read_text(reader)?;
                if !is_canonical_integer(&s) {
                    return Err(Error::malformed(format!("'{}' is not an integer", s)));
                }
                Value::BigInt(s)
            }
            tags::DATE => {
                let kind = DateKind::from_u8(reader.read_u8()?);
                Value::Date(kind, varint::unpack64(reader)?)
            }
            tags::BOOL_ARRAY => {
                let n = read_count(reader)?;
                Value::BoolArray(collect(n, reader, |r| Ok(r.read_u8()? == 1))?)
            }
            tags::BYTE_ARRAY => {
                let n = varint::read_len(reader)?;
                Value::Bytes(reader.read_bytes(n)?.to_vec())
            }
            tags::CHAR_ARRAY => {
                let n = read_count(reader)?;
                Value::CharArray(collect(n, reader, |r| unit_char(r.read_u16()?))?)
            }
            tags::SHORT_ARRAY => {
                let n = read_count(reader)?;
                Value::ShortArray(collect(n, reader, |r| r.read_i16())?)
            }
            tags::INT_ARRAY => {
                let n = read_count(reader)?;
                Value::IntArray(collect(n, reader, varint::unpack32)?)
            }
            tags::LONG_ARRAY => {
                let n = read_count(reader)?;
                Value::LongArray(collect(n, reader, varint::unpack64)?)
            }
            tags::FLOAT_ARRAY => {
                let n = read_count(reader)?;
                Value::FloatArray(collect(n, reader, |r| {
                    Ok(f32::from_bits(varint::unpack32(r)? as u32))
                })?)
            }
            tags::DOUBLE_ARRAY => {
                let n = read_count(reader)?;
                Value::DoubleArray(collect(n, reader, |r| {
                    Ok(f64::from_bits(varint::unpack64(r)? as u64))
                })?)
            }
            tags::STRING_ARRAY => {
                let n = read_count(reader)?;
                Value::StringArray(collect(n, reader, |r| self.read_text(r))?)
            }
            tags::TYPED_ARRAY => {
                let type_name = self.read_text(reader)?;
                let n = read_count(reader)?;
                let items = collect(n, reader, |r| self.decode_value(r, depth + 1))?;
                Value::Array { type_name, items }
            }
            tags::LIST => {
                let n = read_count(reader)?;
                Value::List(collect(n, reader, |r| self.decode_value(r, depth + 1))?)
            }
            tags::MAP => {
                let n = read_count(reader)?;
                let mut map = ValueMap::with_capacity(n.min(reader.remaining()));
                for _ in 0..n {
                    let k = self.decode_value(reader, depth + 1)?;
                    let v = self.decode_value(reader, depth + 1)?;
                    map.insert(k, v);
                }
                Value::Map(map)
            }
            tags::SET => {
                let n = read_count(reader)?;
                let mut set = ValueSet::new();
                for _ in 0..n {
                    set.insert(self.decode_value(reader, depth + 1)?);
                }
                Value::Set(set)
            }
            tags::OPAQUE => match varint::read_len(reader)? {
                0 => Value::Null,
                n => Value::Opaque(reader.read_bytes(n)?.to_vec()),
            },
            tags::KEY_ARRAY => {
                let n = read_count(reader)?;
                let mut array = KeyArray::new();
                for _ in 0..n {
                    let key = ArrayKey::from_value(&self.decode_value(reader, depth + 1)?)?;
                    let v = self.decode_value(reader, depth + 1)?;
                    array.insert(key, v);
                }
                Value::KeyArray(array)
            }
            tags::TWO_KEY => {
                let layout = KeyLayout::try_from(reader.read_u8()?)?;
                if !layout.is_two_key() {
                    return Err(Error::malformed(format!(
                        "{:?} is not a two-key layout",
                        layout
                    )));
                }
                let n = varint::read_len(reader)?;
                let bytes = reader.read_bytes(n)?;
                let (first, second) = KeyCodec::new(self.encoding).decode(layout, bytes)?;
                Value::TwoKey(TwoKey::new(layout, first, second)?)
            }
            code if code >= tags::EXTENSION_BASE => match self.extensions.get(&code) {
                Some(handler) => handler
                    .decode(code, reader)?
                    .ok_or(Error::UnknownTypeTag { tag: code, offset })?,
                None => return Err(Error::UnknownTypeTag { tag: code, offset }),
            },
            tag => return Err(Error::UnknownTypeTag { tag, offset }),
        };

        Ok(match &self.hooks {
            Some(hooks) => hooks.after_decode(value),
            None => value,
        })
    }
}

fn read_count(reader: &mut Reader<'_>) -> Result<usize> {
    varint::read_len(reader)
}

/// Reads `n` elements, never reserving more than the bytes left could hold.
fn collect<T>(
    n: usize,
    reader: &mut Reader<'_>,
    mut read: impl FnMut(&mut Reader<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut items = Vec::with_capacity(n.min(reader.remaining()));
    for _ in 0..n {
        items.push(read(reader)?);
    }
    Ok(items)
}

fn char_unit(c: char) -> Result<u16> {
    u16::try_from(c as u32)
        .map_err(|_| Error::malformed(format!("char {:?} is outside the basic multilingual plane", c)))
}

fn unit_char(unit: u16) -> Result<char> {
    char::from_u32(unit as u32)
        .ok_or_else(|| Error::malformed(format!("unpaired surrogate {:#06x}", unit)))
}
