//! # Composite Key Codec
//!
//! Encodes typed key tuples into byte strings whose byte-lexicographic order
//! matches the tuple order, so an engine that only compares bytes still
//! iterates keys in application order.
//!
//! ## Layout encodings
//!
//! ```text
//! int32 / int64      fixed-width big-endian, sign bit flipped
//! leading str / bin  [len: u16 BE][bytes]         (first of a pair)
//! trailing str / bin [bytes ... to end of key]    (last or only component)
//! multi              [payload...][descriptor n-1]...[descriptor 0][count: u8]
//! free               [bytes]                      (verbatim)
//! ```
//!
//! A length-prefixed leading component orders by (length, bytes). Shorter
//! strings sort first, then equal-length strings sort bytewise. Engines that
//! need plain lexicographic order on the leading string can install
//! [`KeyCodec::compare`] as their comparator.
//!
//! Absent components encode as the zero value of their type (empty string,
//! zero, empty bytes); a key never carries an absence marker.

mod codec;
mod layout;
mod multi;

pub use codec::KeyCodec;
pub use layout::{Component, KeyLayout, Shape};
pub use multi::{decode_multi, encode_multi, MAX_MULTI_COMPONENTS, MAX_MULTI_PART_LEN};

use crate::config::TextEncoding;
use crate::{Error, Result};
use std::borrow::Cow;
use std::cmp::Ordering;

/// One component of a composite key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPart {
    /// Absent component; encodes as the zero value of its slot.
    Null,
    /// Text.
    Str(String),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// 32-bit float (multi keys only).
    F32(f32),
    /// 64-bit float (multi keys only).
    F64(f64),
    /// Raw bytes.
    Bin(Vec<u8>),
    /// Components of a multi-arity key.
    Multi(Vec<KeyPart>),
}

impl KeyPart {
    /// Short name of the variant for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            KeyPart::Null => "null",
            KeyPart::Str(_) => "string",
            KeyPart::I32(_) => "int32",
            KeyPart::I64(_) => "int64",
            KeyPart::F32(_) => "float32",
            KeyPart::F64(_) => "float64",
            KeyPart::Bin(_) => "binary",
            KeyPart::Multi(_) => "multi",
        }
    }

    /// Returns true for `KeyPart::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, KeyPart::Null)
    }

    /// Coerces to text. Numbers are formatted; binary is rejected.
    pub fn to_text(&self) -> Result<Cow<'_, str>> {
        match self {
            KeyPart::Null => Ok(Cow::Borrowed("")),
            KeyPart::Str(s) => Ok(Cow::Borrowed(s)),
            KeyPart::I32(v) => Ok(Cow::Owned(v.to_string())),
            KeyPart::I64(v) => Ok(Cow::Owned(v.to_string())),
            KeyPart::F32(v) => Ok(Cow::Owned(v.to_string())),
            KeyPart::F64(v) => Ok(Cow::Owned(v.to_string())),
            other => Err(Error::malformed(format!("{} component is not text", other.kind()))),
        }
    }

    /// Coerces to int64. Numeric strings are parsed; fractional floats and
    /// non-numeric values are rejected.
    pub fn to_i64(&self) -> Result<i64> {
        match self {
            KeyPart::Null => Ok(0),
            KeyPart::I32(v) => Ok(*v as i64),
            KeyPart::I64(v) => Ok(*v),
            KeyPart::F32(v) => integral(*v as f64),
            KeyPart::F64(v) => integral(*v),
            KeyPart::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::malformed(format!("'{}' is not an integer", s))),
            other => Err(Error::malformed(format!("{} component is not numeric", other.kind()))),
        }
    }

    /// Coerces to int32; values outside the 32-bit range are rejected.
    pub fn to_i32(&self) -> Result<i32> {
        let wide = self.to_i64()?;
        i32::try_from(wide).map_err(|_| Error::malformed(format!("{} does not fit in int32", wide)))
    }

    /// Coerces to bytes. Text is transcoded with `encoding`.
    pub fn to_bin(&self, encoding: TextEncoding) -> Result<Cow<'_, [u8]>> {
        match self {
            KeyPart::Null => Ok(Cow::Borrowed(&[])),
            KeyPart::Bin(b) => Ok(Cow::Borrowed(b)),
            KeyPart::Str(s) => Ok(crate::buffer::encode_text(s, encoding)),
            other => Err(Error::malformed(format!("{} component is not binary", other.kind()))),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            KeyPart::Null => 0,
            KeyPart::I32(_) | KeyPart::I64(_) | KeyPart::F32(_) | KeyPart::F64(_) => 1,
            KeyPart::Str(_) => 2,
            KeyPart::Bin(_) => 3,
            KeyPart::Multi(_) => 4,
        }
    }

    /// Natural ordering between components: numbers numerically, text and
    /// bytes lexicographically, multi keys component by component.
    pub fn natural_cmp(&self, other: &KeyPart) -> Ordering {
        use KeyPart::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Str(a), Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Bin(a), Bin(b)) => a.cmp(b),
            (Multi(a), Multi(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.natural_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (F32(_) | F64(_), _) | (_, F32(_) | F64(_))
                if self.rank() == 1 && other.rank() == 1 =>
            {
                as_f64(self).total_cmp(&as_f64(other))
            }
            (I32(_) | I64(_), I32(_) | I64(_)) => as_i64(self).cmp(&as_i64(other)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn integral(v: f64) -> Result<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Ok(v as i64)
    } else {
        Err(Error::malformed(format!("{} is not an integral value", v)))
    }
}

fn as_i64(part: &KeyPart) -> i64 {
    match part {
        KeyPart::I32(v) => *v as i64,
        KeyPart::I64(v) => *v,
        _ => 0,
    }
}

fn as_f64(part: &KeyPart) -> f64 {
    match part {
        KeyPart::I32(v) => *v as f64,
        KeyPart::I64(v) => *v as f64,
        KeyPart::F32(v) => *v as f64,
        KeyPart::F64(v) => *v,
        _ => 0.0,
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Str(s.to_owned())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Str(s)
    }
}

impl From<i32> for KeyPart {
    fn from(v: i32) -> Self {
        KeyPart::I32(v)
    }
}

impl From<i64> for KeyPart {
    fn from(v: i64) -> Self {
        KeyPart::I64(v)
    }
}

impl From<f32> for KeyPart {
    fn from(v: f32) -> Self {
        KeyPart::F32(v)
    }
}

impl From<f64> for KeyPart {
    fn from(v: f64) -> Self {
        KeyPart::F64(v)
    }
}

impl From<Vec<u8>> for KeyPart {
    fn from(v: Vec<u8>) -> Self {
        KeyPart::Bin(v)
    }
}

impl From<&[u8]> for KeyPart {
    fn from(v: &[u8]) -> Self {
        KeyPart::Bin(v.to_vec())
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(v: Option<T>) -> Self {
        v.map_or(KeyPart::Null, Into::into)
    }
}

/// A two-component key carried as a value (tag 80).
#[derive(Debug, Clone, PartialEq)]
pub struct TwoKey {
    layout: KeyLayout,
    first: KeyPart,
    second: KeyPart,
}

impl TwoKey {
    /// Creates a two-key; `layout` must be one of the pair layouts.
    pub fn new(
        layout: KeyLayout,
        first: impl Into<KeyPart>,
        second: impl Into<KeyPart>,
    ) -> Result<Self> {
        if !layout.is_two_key() {
            return Err(Error::invalid_argument(format!("{:?} is not a two-key layout", layout)));
        }
        Ok(Self { layout, first: first.into(), second: second.into() })
    }

    /// The layout.
    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    /// First component.
    pub fn first(&self) -> &KeyPart {
        &self.first
    }

    /// Second component.
    pub fn second(&self) -> &KeyPart {
        &self.second
    }

    /// Splits into components.
    pub fn into_parts(self) -> (KeyPart, KeyPart) {
        (self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercions() {
        assert_eq!(KeyPart::from("42").to_i32().unwrap(), 42);
        assert_eq!(KeyPart::I64(7).to_i32().unwrap(), 7);
        assert_eq!(KeyPart::Null.to_i64().unwrap(), 0);
        assert_eq!(KeyPart::F64(3.0).to_i64().unwrap(), 3);
        assert_eq!(KeyPart::I32(-5).to_text().unwrap(), "-5");
        assert_eq!(KeyPart::Null.to_text().unwrap(), "");

        assert!(matches!(KeyPart::I64(1 << 40).to_i32(), Err(Error::MalformedComponent(_))));
        assert!(matches!(KeyPart::from("abc").to_i64(), Err(Error::MalformedComponent(_))));
        assert!(matches!(KeyPart::F64(1.5).to_i64(), Err(Error::MalformedComponent(_))));
        assert!(matches!(KeyPart::Bin(vec![1]).to_text(), Err(Error::MalformedComponent(_))));
        assert!(matches!(
            KeyPart::I32(1).to_bin(TextEncoding::Utf8),
            Err(Error::MalformedComponent(_))
        ));
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(KeyPart::I32(-1).natural_cmp(&KeyPart::I64(0)), Ordering::Less);
        assert_eq!(KeyPart::from("b").natural_cmp(&KeyPart::from("ab")), Ordering::Greater);
        assert_eq!(KeyPart::F64(1.5).natural_cmp(&KeyPart::I32(1)), Ordering::Greater);
        assert_eq!(KeyPart::Null.natural_cmp(&KeyPart::I32(i32::MIN)), Ordering::Less);
        let a = KeyPart::Multi(vec![KeyPart::I32(1), KeyPart::from("x")]);
        let b = KeyPart::Multi(vec![KeyPart::I32(1), KeyPart::from("x"), KeyPart::I32(0)]);
        assert_eq!(a.natural_cmp(&b), Ordering::Less);
    }

    #[test]
    fn test_two_key_requires_pair_layout() {
        assert!(TwoKey::new(KeyLayout::N64Str, -42i64, "café").is_ok());
        assert!(matches!(
            TwoKey::new(KeyLayout::Str, "a", KeyPart::Null),
            Err(Error::InvalidArgument(_))
        ));
    }
}
