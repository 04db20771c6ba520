//! # Object Value Codec
//!
//! [`Value`] is the closed set of kinds the codec can store. Each kind has a
//! one-byte tag followed by a kind-specific payload; containers recurse.
//!
//! ## Tag table
//!
//! ```text
//! 0xFF null          1  string        2  bool          3  char (u16 BE)
//!    4 int8          5  int16 (BE)    6  int32 (v32)   7  int64 (v64)
//!    8 f32 (v32)     9  f64 (v64)    10  atomic i32   11  atomic i64
//!   12 decimal      13  big integer  14  date (kind u8 + v64 millis)
//!   20 bool[]       21  byte[]       22  char[]       23  short[]
//!   24 int[]        25  long[]       26  float[]      27  double[]
//!   28 string[]     50  typed array  51  list         52  map
//!   53 set          60  opaque       70  key-array    80  two-key
//!  100+ extensions
//! ```
//!
//! `v32`/`v64` are the [`varint`](crate::varint) packers. Every length is a
//! `v32`.

mod codec;
mod extension;
pub mod json;

pub use codec::ValueCodec;
pub use extension::{ExtensionRegistry, RawExtension, ValueExtension, ValueHooks};

use crate::key::TwoKey;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;

/// Wire tags.
pub mod tags {
    /// Absent value.
    pub const NULL: u8 = 0xff;
    /// UTF-8 or UTF-16 string.
    pub const STRING: u8 = 1;
    /// Boolean.
    pub const BOOL: u8 = 2;
    /// UTF-16 code unit.
    pub const CHAR: u8 = 3;
    /// Signed byte.
    pub const I8: u8 = 4;
    /// Signed 16-bit integer.
    pub const I16: u8 = 5;
    /// Signed 32-bit integer.
    pub const I32: u8 = 6;
    /// Signed 64-bit integer.
    pub const I64: u8 = 7;
    /// 32-bit float.
    pub const F32: u8 = 8;
    /// 64-bit float.
    pub const F64: u8 = 9;
    /// Atomic 32-bit integer snapshot.
    pub const ATOMIC_I32: u8 = 10;
    /// Atomic 64-bit integer snapshot.
    pub const ATOMIC_I64: u8 = 11;
    /// Arbitrary-precision decimal.
    pub const DECIMAL: u8 = 12;
    /// Arbitrary-precision integer.
    pub const BIG_INTEGER: u8 = 13;
    /// Date-like value.
    pub const DATE: u8 = 14;
    /// Boolean array.
    pub const BOOL_ARRAY: u8 = 20;
    /// Byte array.
    pub const BYTE_ARRAY: u8 = 21;
    /// Char array.
    pub const CHAR_ARRAY: u8 = 22;
    /// Short array.
    pub const SHORT_ARRAY: u8 = 23;
    /// Int array.
    pub const INT_ARRAY: u8 = 24;
    /// Long array.
    pub const LONG_ARRAY: u8 = 25;
    /// Float array.
    pub const FLOAT_ARRAY: u8 = 26;
    /// Double array.
    pub const DOUBLE_ARRAY: u8 = 27;
    /// String array.
    pub const STRING_ARRAY: u8 = 28;
    /// Heterogeneous array with an element type name.
    pub const TYPED_ARRAY: u8 = 50;
    /// Ordered sequence.
    pub const LIST: u8 = 51;
    /// Key-unique mapping.
    pub const MAP: u8 = 52;
    /// Unique elements.
    pub const SET: u8 = 53;
    /// Opaque serialized object.
    pub const OPAQUE: u8 = 60;
    /// Sorted key-array.
    pub const KEY_ARRAY: u8 = 70;
    /// Two-component composite key.
    pub const TWO_KEY: u8 = 80;
    /// First caller-defined tag.
    pub const EXTENSION_BASE: u8 = 100;
}

/// Sub-kind of a date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DateKind {
    /// Calendar date.
    Date = 1,
    /// Time of day.
    Time = 2,
    /// Timestamp.
    Timestamp = 3,
    /// Any other instant.
    Other = 4,
}

impl DateKind {
    /// Convert from u8. Unknown sub-kinds decode as `Other`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => DateKind::Date,
            2 => DateKind::Time,
            3 => DateKind::Timestamp,
            _ => DateKind::Other,
        }
    }
}

/// A value the codec can encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Text.
    Str(String),
    /// Boolean.
    Bool(bool),
    /// A character in the basic multilingual plane.
    Char(char),
    /// Signed byte.
    I8(i8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Snapshot of an atomic 32-bit counter.
    AtomicI32(i32),
    /// Snapshot of an atomic 64-bit counter.
    AtomicI64(i64),
    /// Arbitrary-precision decimal in canonical string form.
    Decimal(String),
    /// Arbitrary-precision integer in canonical string form.
    BigInt(String),
    /// Millisecond instant with a sub-kind.
    Date(DateKind, i64),
    /// Boolean array.
    BoolArray(Vec<bool>),
    /// Byte array.
    Bytes(Vec<u8>),
    /// Char array.
    CharArray(Vec<char>),
    /// Short array.
    ShortArray(Vec<i16>),
    /// Int array.
    IntArray(Vec<i32>),
    /// Long array.
    LongArray(Vec<i64>),
    /// Float array.
    FloatArray(Vec<f32>),
    /// Double array.
    DoubleArray(Vec<f64>),
    /// String array.
    StringArray(Vec<String>),
    /// Heterogeneous array; an empty type name means "any value".
    Array {
        /// Element type name.
        type_name: String,
        /// Elements.
        items: Vec<Value>,
    },
    /// Ordered sequence.
    List(Vec<Value>),
    /// Key-unique mapping in insertion order.
    Map(ValueMap),
    /// Unique elements in insertion order.
    Set(ValueSet),
    /// Sorted associative array.
    KeyArray(KeyArray),
    /// Two-component composite key.
    TwoKey(TwoKey),
    /// Opaque serialized object (`bincode`).
    Opaque(Vec<u8>),
    /// Caller-defined kind handled by a registered extension.
    Extension {
        /// Tag, at least 100.
        code: u8,
        /// Payload understood by the extension.
        data: Vec<u8>,
    },
}

impl Value {
    /// Short name of the kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::I8(_) => "int8",
            Value::I16(_) => "int16",
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
            Value::AtomicI32(_) => "atomic-int32",
            Value::AtomicI64(_) => "atomic-int64",
            Value::Decimal(_) => "decimal",
            Value::BigInt(_) => "big-integer",
            Value::Date(..) => "date",
            Value::BoolArray(_) => "bool[]",
            Value::Bytes(_) => "byte[]",
            Value::CharArray(_) => "char[]",
            Value::ShortArray(_) => "short[]",
            Value::IntArray(_) => "int[]",
            Value::LongArray(_) => "long[]",
            Value::FloatArray(_) => "float[]",
            Value::DoubleArray(_) => "double[]",
            Value::StringArray(_) => "string[]",
            Value::Array { .. } => "array",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::KeyArray(_) => "key-array",
            Value::TwoKey(_) => "two-key",
            Value::Opaque(_) => "opaque",
            Value::Extension { .. } => "extension",
        }
    }

    /// The tag this value is written with.
    pub fn tag(&self) -> u8 {
        match self {
            Value::Null => tags::NULL,
            Value::Str(_) => tags::STRING,
            Value::Bool(_) => tags::BOOL,
            Value::Char(_) => tags::CHAR,
            Value::I8(_) => tags::I8,
            Value::I16(_) => tags::I16,
            Value::I32(_) => tags::I32,
            Value::I64(_) => tags::I64,
            Value::F32(_) => tags::F32,
            Value::F64(_) => tags::F64,
            Value::AtomicI32(_) => tags::ATOMIC_I32,
            Value::AtomicI64(_) => tags::ATOMIC_I64,
            Value::Decimal(_) => tags::DECIMAL,
            Value::BigInt(_) => tags::BIG_INTEGER,
            Value::Date(..) => tags::DATE,
            Value::BoolArray(_) => tags::BOOL_ARRAY,
            Value::Bytes(_) => tags::BYTE_ARRAY,
            Value::CharArray(_) => tags::CHAR_ARRAY,
            Value::ShortArray(_) => tags::SHORT_ARRAY,
            Value::IntArray(_) => tags::INT_ARRAY,
            Value::LongArray(_) => tags::LONG_ARRAY,
            Value::FloatArray(_) => tags::FLOAT_ARRAY,
            Value::DoubleArray(_) => tags::DOUBLE_ARRAY,
            Value::StringArray(_) => tags::STRING_ARRAY,
            Value::Array { .. } => tags::TYPED_ARRAY,
            Value::List(_) => tags::LIST,
            Value::Map(_) => tags::MAP,
            Value::Set(_) => tags::SET,
            Value::KeyArray(_) => tags::KEY_ARRAY,
            Value::TwoKey(_) => tags::TWO_KEY,
            Value::Opaque(_) => tags::OPAQUE,
            Value::Extension { code, .. } => *code,
        }
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns any integer kind widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) | Value::AtomicI32(v) => Some(*v as i64),
            Value::I64(v) | Value::AtomicI64(v) => Some(*v),
            _ => None,
        }
    }

    /// Builds a list.
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// Builds a map from key/value pairs; later duplicates win.
    pub fn map<K: Into<Value>, V: Into<Value>, I: IntoIterator<Item = (K, V)>>(entries: I) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Serializes `object` into an opaque value.
    pub fn opaque<T: Serialize>(object: &T) -> Result<Value> {
        Ok(Value::Opaque(bincode::serialize(object)?))
    }

    /// Deserializes an opaque value.
    pub fn to_object<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Value::Opaque(bytes) => Ok(bincode::deserialize(bytes)?),
            other => Err(Error::malformed(format!("{} is not an opaque value", other.kind()))),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Str,
    Vec<u8> => Bytes,
    Vec<bool> => BoolArray,
    Vec<i16> => ShortArray,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<String> => StringArray,
    Vec<Value> => List,
    ValueMap => Map,
    ValueSet => Set,
    KeyArray => KeyArray,
    TwoKey => TwoKey,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Key-unique mapping that keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
}

impl ValueMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Inserts or replaces; returns the previous value for `key`.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Looks up a key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Looks up a string key.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k.as_str() == Some(key)).map(|(_, v)| v)
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Unique elements in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSet {
    items: Vec<Value>,
}

impl ValueSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value`; returns false if it was already present.
    pub fn insert(&mut self, value: Value) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.items.push(value);
        true
    }

    /// Membership test.
    pub fn contains(&self, value: &Value) -> bool {
        self.items.contains(value)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates elements in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

/// Key of a [`KeyArray`] entry.
///
/// Numbers sort before text; numbers compare numerically and text
/// bytewise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArrayKey {
    /// Numeric key.
    Num(i64),
    /// Text key.
    Text(String),
}

impl ArrayKey {
    /// Normalizes a value into a key. Numeric strings become numbers.
    pub fn from_value(value: &Value) -> Result<ArrayKey> {
        if let Some(n) = value.as_i64() {
            return Ok(ArrayKey::Num(n));
        }
        match value {
            Value::Str(s) => Ok(ArrayKey::from(s.as_str())),
            Value::F32(f) if f.fract() == 0.0 && f.is_finite() => Ok(ArrayKey::Num(*f as i64)),
            Value::F64(f) if f.fract() == 0.0 && f.is_finite() => Ok(ArrayKey::Num(*f as i64)),
            Value::Bool(b) => Ok(ArrayKey::Text(b.to_string())),
            Value::Char(c) => Ok(ArrayKey::from(c.to_string())),
            other => Err(Error::malformed(format!("{} cannot be a key-array key", other.kind()))),
        }
    }

    /// Re-applies the numeric-string rule to a directly built `Text` key.
    pub fn normalize(self) -> ArrayKey {
        match self {
            ArrayKey::Text(s) => ArrayKey::from(s),
            num => num,
        }
    }

    /// The value a key is written as.
    pub fn to_value(&self) -> Value {
        match self {
            ArrayKey::Num(n) => Value::I64(*n),
            ArrayKey::Text(s) => Value::Str(s.clone()),
        }
    }
}

impl From<i64> for ArrayKey {
    fn from(n: i64) -> Self {
        ArrayKey::Num(n)
    }
}

impl From<&str> for ArrayKey {
    fn from(s: &str) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) => ArrayKey::Num(n),
            Err(_) => ArrayKey::Text(s.to_owned()),
        }
    }
}

impl From<String> for ArrayKey {
    fn from(s: String) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) => ArrayKey::Num(n),
            Err(_) => ArrayKey::Text(s),
        }
    }
}

/// Associative array kept sorted by [`ArrayKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyArray {
    entries: Vec<(ArrayKey, Value)>,
}

impl KeyArray {
    /// Creates an empty key-array.
    pub fn new() -> Self {
        Self::default()
    }

    fn search(&self, key: &ArrayKey) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }

    /// Inserts or replaces; returns the previous value.
    pub fn insert(&mut self, key: impl Into<ArrayKey>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into().normalize();
        match self.search(&key) {
            Ok(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value.into())),
            Err(idx) => {
                self.entries.insert(idx, (key, value.into()));
                None
            }
        }
    }

    /// Looks up a key.
    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        let key = key.clone().normalize();
        self.search(&key).ok().map(|idx| &self.entries[idx].1)
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &ArrayKey) -> Option<Value> {
        let idx = self.search(&key.clone().normalize()).ok()?;
        Some(self.entries.remove(idx).1)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArrayKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Orders two keys the way entries are stored.
    pub fn compare_keys(a: &ArrayKey, b: &ArrayKey) -> Ordering {
        a.cmp(b)
    }
}

/// Checks the canonical string form of a big integer: optional sign, digits.
pub(crate) fn is_canonical_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Checks the canonical string form of a decimal: integer part, optional
/// fraction, optional exponent.
pub(crate) fn is_canonical_decimal(s: &str) -> bool {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    };
    let unsigned = mantissa.strip_prefix(['-', '+']).unwrap_or(mantissa);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = all_digits(int_part)
        && frac_part.map_or(true, all_digits)
        && (!int_part.is_empty() || frac_part.map_or(false, |f| !f.is_empty()));
    mantissa_ok && exponent.map_or(true, is_canonical_integer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_value_map_replaces() {
        let mut map = ValueMap::new();
        assert!(map.insert("a".into(), 1.into()).is_none());
        assert_eq!(map.insert("a".into(), 2.into()), Some(Value::I32(1)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_str("a"), Some(&Value::I32(2)));
        assert_eq!(map.remove(&"a".into()), Some(Value::I32(2)));
        assert!(map.is_empty());
    }

    #[test]
    fn test_value_set_dedups() {
        let set: ValueSet = vec![Value::I32(1), Value::I32(1), Value::from("x")].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::from("x")));
    }

    #[test]
    fn test_key_array_sorted() {
        let mut arr = KeyArray::new();
        arr.insert("b", 1);
        arr.insert(10i64, 2);
        arr.insert(-3i64, 3);
        arr.insert("a", 4);
        let keys: Vec<_> = arr.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(
            keys,
            vec![ArrayKey::Num(-3), ArrayKey::Num(10), ArrayKey::from("a"), ArrayKey::from("b")]
        );
        assert_eq!(arr.insert(10i64, 5), Some(Value::I32(2)));
        assert_eq!(arr.get(&ArrayKey::Num(10)), Some(&Value::I32(5)));
    }

    #[test]
    fn test_array_key_normalization() {
        assert_eq!(ArrayKey::from_value(&"42".into()).unwrap(), ArrayKey::Num(42));
        assert_eq!(ArrayKey::from_value(&Value::I8(3)).unwrap(), ArrayKey::Num(3));
        assert_eq!(ArrayKey::from_value(&"k".into()).unwrap(), ArrayKey::from("k"));
        assert!(ArrayKey::from_value(&Value::Null).is_err());
        assert!(ArrayKey::from_value(&Value::List(vec![])).is_err());
    }

    #[test]
    fn test_numeric_text_keys_normalize_on_insert() {
        let mut arr = KeyArray::new();
        arr.insert("42", 1i32);
        arr.insert(ArrayKey::Text(" 7".into()), 2i32);
        arr.insert(String::from("x7"), 3i32);
        let keys: Vec<_> = arr.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![ArrayKey::Num(7), ArrayKey::Num(42), ArrayKey::Text("x7".into())]);
        assert_eq!(arr.get(&ArrayKey::Text("42".into())), Some(&Value::I32(1)));
        assert_eq!(arr.remove(&ArrayKey::from(" 7")), Some(Value::I32(2)));
        assert_eq!(ArrayKey::from_value(&Value::Char('5')).unwrap(), ArrayKey::Num(5));
    }

    #[test]
    fn test_canonical_forms() {
        assert!(is_canonical_integer("-123"));
        assert!(!is_canonical_integer("12a"));
        assert!(!is_canonical_integer("-"));
        assert!(is_canonical_decimal("3.14"));
        assert!(is_canonical_decimal("-1E+10"));
        assert!(is_canonical_decimal(".5"));
        assert!(!is_canonical_decimal("1.2.3"));
        assert!(!is_canonical_decimal("."));
        assert!(!is_canonical_decimal("1e"));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: String,
    }

    #[test]
    fn test_opaque_objects() {
        let p = Point { x: 3, y: "up".into() };
        let v = Value::opaque(&p).unwrap();
        assert_eq!(v.tag(), tags::OPAQUE);
        assert_eq!(v.to_object::<Point>().unwrap(), p);
        assert!(Value::I32(1).to_object::<Point>().is_err());
    }

    #[test]
    fn test_date_kind_from_u8() {
        assert_eq!(DateKind::from_u8(3), DateKind::Timestamp);
        assert_eq!(DateKind::from_u8(9), DateKind::Other);
    }
}
