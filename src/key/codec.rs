//! Per-layout key encoding and decoding.

use super::layout::{Component, KeyLayout, Shape};
use super::multi::{decode_multi, encode_multi};
use super::KeyPart;
use crate::buffer::{decode_text, ByteSink, NativeBuffer};
use crate::config::TextEncoding;
use crate::cursor::Reader;
use crate::{Error, Result};
use std::cmp::Ordering;

const SIGN32: u32 = 0x8000_0000;
const SIGN64: u64 = 0x8000_0000_0000_0000;

/// Largest leading variable-width component (u16 length prefix).
pub const MAX_PREFIXED_LEN: usize = u16::MAX as usize;

/// Encodes and decodes composite keys for every [`KeyLayout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyCodec {
    encoding: TextEncoding,
}

impl KeyCodec {
    /// Creates a codec that transcodes text components with `encoding`.
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    /// Text encoding of string components.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Writes the key into `buf`, replacing its contents.
    pub fn encode_into(
        &self,
        buf: &mut NativeBuffer,
        layout: KeyLayout,
        first: &KeyPart,
        second: &KeyPart,
    ) -> Result<()> {
        buf.set_position(0)?;
        self.encode(buf, layout, first, second)
    }

    /// Appends the encoded key to `out`.
    ///
    /// `second` must be `KeyPart::Null` for single, multi and free layouts.
    pub fn encode<S: ByteSink + ?Sized>(
        &self,
        out: &mut S,
        layout: KeyLayout,
        first: &KeyPart,
        second: &KeyPart,
    ) -> Result<()> {
        match layout.shape() {
            Shape::Single(kind) => {
                expect_null(layout, second)?;
                self.put_component(out, kind, first, false)
            }
            Shape::Pair(a, b) => {
                self.put_component(out, a, first, true)?;
                self.put_component(out, b, second, false)
            }
            Shape::Multi => {
                expect_null(layout, second)?;
                match first {
                    KeyPart::Multi(parts) => encode_multi(out, parts),
                    KeyPart::Null => Ok(()),
                    scalar => encode_multi(out, std::slice::from_ref(scalar)),
                }
            }
            Shape::Free => {
                expect_null(layout, second)?;
                out.put(&first.to_bin(self.encoding)?)
            }
        }
    }

    /// Encodes the key into a fresh vector.
    pub fn to_vec(&self, layout: KeyLayout, first: &KeyPart, second: &KeyPart) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out, layout, first, second)?;
        Ok(out)
    }

    fn put_component<S: ByteSink + ?Sized>(
        &self,
        out: &mut S,
        kind: Component,
        part: &KeyPart,
        leading: bool,
    ) -> Result<()> {
        match kind {
            Component::N32 => out.put(&((part.to_i32()? as u32) ^ SIGN32).to_be_bytes()),
            Component::N64 => out.put(&((part.to_i64()? as u64) ^ SIGN64).to_be_bytes()),
            Component::Str => {
                let text = part.to_text()?;
                let bytes = crate::buffer::encode_text(&text, self.encoding);
                put_variable(out, &bytes, leading)
            }
            Component::Bin => put_variable(out, &part.to_bin(self.encoding)?, leading),
        }
    }

    /// Decodes a key. Single, multi and free layouts return
    /// `KeyPart::Null` as the second component.
    pub fn decode(&self, layout: KeyLayout, bytes: &[u8]) -> Result<(KeyPart, KeyPart)> {
        match layout.shape() {
            Shape::Single(kind) => {
                let mut reader = Reader::new(bytes);
                let part = self.take_component(&mut reader, kind, false)?;
                finish(&reader, layout)?;
                Ok((part, KeyPart::Null))
            }
            Shape::Pair(a, b) => {
                let mut reader = Reader::new(bytes);
                let first = self.take_component(&mut reader, a, true)?;
                let second = self.take_component(&mut reader, b, false)?;
                finish(&reader, layout)?;
                Ok((first, second))
            }
            Shape::Multi => Ok((KeyPart::Multi(decode_multi(bytes)?), KeyPart::Null)),
            Shape::Free => Ok((KeyPart::Bin(bytes.to_vec()), KeyPart::Null)),
        }
    }

    fn take_component(
        &self,
        reader: &mut Reader<'_>,
        kind: Component,
        leading: bool,
    ) -> Result<KeyPart> {
        match kind {
            Component::N32 => {
                let raw = reader.read_u32().map_err(|_| truncated(kind))?;
                Ok(KeyPart::I32((raw ^ SIGN32) as i32))
            }
            Component::N64 => {
                let raw = reader.read_u64().map_err(|_| truncated(kind))?;
                Ok(KeyPart::I64((raw ^ SIGN64) as i64))
            }
            Component::Str => {
                let bytes = take_variable(reader, leading)?;
                Ok(KeyPart::Str(decode_text(bytes, self.encoding)?))
            }
            Component::Bin => Ok(KeyPart::Bin(take_variable(reader, leading)?.to_vec())),
        }
    }

    /// Compares two encoded keys of `layout` in natural tuple order.
    ///
    /// Keys that fail to decode fall back to plain byte order.
    pub fn compare(&self, layout: KeyLayout, a: &[u8], b: &[u8]) -> Ordering {
        match (self.decode(layout, a), self.decode(layout, b)) {
            (Ok((a1, a2)), Ok((b1, b2))) => a1.natural_cmp(&b1).then_with(|| a2.natural_cmp(&b2)),
            _ => a.cmp(b),
        }
    }
}

impl KeyLayout {
    /// Natural-order comparator over UTF-8 encoded keys of this layout.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        KeyCodec::default().compare(*self, a, b)
    }
}

fn put_variable<S: ByteSink + ?Sized>(out: &mut S, bytes: &[u8], leading: bool) -> Result<()> {
    if leading {
        let len = u16::try_from(bytes.len()).map_err(|_| {
            Error::malformed(format!(
                "leading key component of {} bytes exceeds {}",
                bytes.len(),
                MAX_PREFIXED_LEN
            ))
        })?;
        out.put(&len.to_be_bytes())?;
    }
    out.put(bytes)
}

fn take_variable<'a>(reader: &mut Reader<'a>, leading: bool) -> Result<&'a [u8]> {
    if leading {
        let len = reader
            .read_u16()
            .map_err(|_| Error::malformed("key is missing its length prefix"))?;
        reader.read_bytes(len as usize).map_err(|_| {
            Error::malformed(format!("length prefix {} overruns the key", len))
        })
    } else {
        Ok(reader.read_rest())
    }
}

fn truncated(kind: Component) -> Error {
    Error::malformed(format!("key too short for {:?} component", kind))
}

fn finish(reader: &Reader<'_>, layout: KeyLayout) -> Result<()> {
    if reader.is_exhausted() {
        Ok(())
    } else {
        Err(Error::malformed(format!(
            "{} trailing bytes after {:?} key",
            reader.remaining(),
            layout
        )))
    }
}

fn expect_null(layout: KeyLayout, second: &KeyPart) -> Result<()> {
    if second.is_null() {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!("{:?} keys take a single component", layout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> KeyCodec {
        KeyCodec::default()
    }

    fn enc(layout: KeyLayout, a: impl Into<KeyPart>, b: impl Into<KeyPart>) -> Vec<u8> {
        codec().to_vec(layout, &a.into(), &b.into()).unwrap()
    }

    #[test]
    fn test_int_layout_bytes() {
        assert_eq!(enc(KeyLayout::N32, 0, KeyPart::Null), vec![0x80, 0, 0, 0]);
        assert_eq!(enc(KeyLayout::N32, -1, KeyPart::Null), vec![0x7f, 0xff, 0xff, 0xff]);
        assert_eq!(enc(KeyLayout::N64, 1i64, KeyPart::Null), vec![0x80, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_pair_layout_bytes() {
        let bytes = enc(KeyLayout::StrN32, "ab", 1);
        assert_eq!(bytes, vec![0x00, 0x02, b'a', b'b', 0x80, 0, 0, 1]);

        let bytes = enc(KeyLayout::N32Str, 1, "ab");
        assert_eq!(bytes, vec![0x80, 0, 0, 1, b'a', b'b']);

        let bytes = enc(KeyLayout::BinBin, vec![9u8], vec![7u8, 8]);
        assert_eq!(bytes, vec![0x00, 0x01, 9, 7, 8]);
    }

    #[test]
    fn test_every_pair_layout_roundtrips() {
        let sample = |c: Component| match c {
            Component::Str => KeyPart::from("café"),
            Component::N32 => KeyPart::I32(-7),
            Component::N64 => KeyPart::I64(i64::MIN + 1),
            Component::Bin => KeyPart::Bin(vec![0, 1, 2, 0xff]),
        };
        for layout in KeyLayout::ALL {
            let (first, second) = match layout.shape() {
                Shape::Single(a) => (sample(a), KeyPart::Null),
                Shape::Pair(a, b) => (sample(a), sample(b)),
                Shape::Multi => (KeyPart::Multi(vec![KeyPart::I32(3), "x".into()]), KeyPart::Null),
                Shape::Free => (KeyPart::Bin(vec![5, 6]), KeyPart::Null),
            };
            let bytes = codec().to_vec(layout, &first, &second).unwrap();
            let decoded = codec().decode(layout, &bytes).unwrap();
            assert_eq!(decoded, (first, second), "layout {:?}", layout);

            let again = codec().to_vec(layout, &decoded.0, &decoded.1).unwrap();
            assert_eq!(again, bytes);
        }
    }

    #[test]
    fn test_null_components_encode_zero_values() {
        let bytes = enc(KeyLayout::StrN64, KeyPart::Null, KeyPart::Null);
        assert_eq!(bytes, vec![0, 0, 0x80, 0, 0, 0, 0, 0, 0, 0]);
        let (a, b) = codec().decode(KeyLayout::StrN64, &bytes).unwrap();
        assert_eq!(a, KeyPart::from(""));
        assert_eq!(b, KeyPart::I64(0));
    }

    #[test]
    fn test_coerced_components() {
        assert_eq!(enc(KeyLayout::N32, "12", KeyPart::Null), enc(KeyLayout::N32, 12, KeyPart::Null));
        assert_eq!(enc(KeyLayout::Str, 12, KeyPart::Null), b"12".to_vec());
        let err = codec().to_vec(KeyLayout::N32, &KeyPart::from("x"), &KeyPart::Null).unwrap_err();
        assert!(matches!(err, Error::MalformedComponent(_)));
    }

    #[test]
    fn test_malformed_keys() {
        assert!(codec().decode(KeyLayout::N32, &[1, 2, 3]).is_err());
        assert!(codec().decode(KeyLayout::N32, &[1, 2, 3, 4, 5]).is_err());
        assert!(codec().decode(KeyLayout::StrStr, &[0, 9, b'a']).is_err());
        assert!(codec().decode(KeyLayout::StrN32, &[0]).is_err());
        assert!(codec().decode(KeyLayout::Str, &[0xff]).is_err());
    }

    #[test]
    fn test_oversized_leading_component() {
        let long = "x".repeat(MAX_PREFIXED_LEN + 1);
        let err = codec().to_vec(KeyLayout::StrN32, &KeyPart::from(long), &KeyPart::I32(0));
        assert!(matches!(err, Err(Error::MalformedComponent(_))));
        let fits = "x".repeat(MAX_PREFIXED_LEN);
        assert!(codec().to_vec(KeyLayout::StrN32, &KeyPart::from(fits), &KeyPart::I32(0)).is_ok());
    }

    #[test]
    fn test_single_layouts_reject_second_component() {
        let err = codec().to_vec(KeyLayout::N32, &KeyPart::I32(1), &KeyPart::I32(2));
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_signed_order() {
        let neg = enc(KeyLayout::N64Str, -42i64, "café");
        let pos = enc(KeyLayout::N64Str, 41i64, "café");
        assert!(neg < pos);
        assert_eq!(
            codec().decode(KeyLayout::N64Str, &neg).unwrap(),
            (KeyPart::I64(-42), KeyPart::from("café"))
        );
    }

    #[test]
    fn test_natural_comparator() {
        let a = enc(KeyLayout::StrN32, "b", 1);
        let b = enc(KeyLayout::StrN32, "ab", 1);
        // Length prefix puts the shorter string first in byte order.
        assert!(a < b);
        assert_eq!(KeyLayout::StrN32.compare(&a, &b), Ordering::Greater);
        assert_eq!(KeyLayout::StrN32.compare(&a, &a), Ordering::Equal);
        assert_eq!(KeyLayout::N32.compare(&[1], &[2]), Ordering::Less);
    }

    #[test]
    fn test_utf16_components() {
        let codec = KeyCodec::new(TextEncoding::Utf16);
        let bytes = codec.to_vec(KeyLayout::StrStr, &"a".into(), &"é".into()).unwrap();
        assert_eq!(bytes, vec![0, 2, 0, b'a', 0x00, 0xe9]);
        let (a, b) = codec.decode(KeyLayout::StrStr, &bytes).unwrap();
        assert_eq!((a, b), (KeyPart::from("a"), KeyPart::from("é")));
    }

    #[test]
    fn test_encode_into_replaces_contents() {
        use crate::config::BackendKind;
        use crate::memory::select_backend;

        let mut buf = NativeBuffer::new(select_backend(BackendKind::Direct));
        buf.append_slice(b"stale bytes").unwrap();
        codec().encode_into(&mut buf, KeyLayout::N32, &KeyPart::I32(0), &KeyPart::Null).unwrap();
        assert_eq!(buf.as_slice(), &[0x80, 0, 0, 0]);
    }
}
