//! Variable-arity key encoding.
//!
//! ```text
//! +-----------+-----------+-----+--------------+-----+--------------+-------+
//! | payload 0 | payload 1 | ... | descriptor   | ... | descriptor 0 | count |
//! |           |           |     | n-1 (2 bytes)|     | (2 bytes)    | (u8)  |
//! +-----------+-----------+-----+--------------+-----+--------------+-------+
//!
//! descriptor byte 0 = type << 6 | (len >> 8) & 0x3f
//! descriptor byte 1 = len & 0xff
//! ```
//!
//! Descriptors sit in reverse so a decoder can walk back from the count
//! byte without scanning the payload. The payload region alone is a flat
//! concatenation, usable as a prefix for range seeks.

use super::KeyPart;
use crate::buffer::ByteSink;
use crate::cursor::Reader;
use crate::{Error, Result};

/// Maximum number of components in a multi key.
pub const MAX_MULTI_COMPONENTS: usize = 255;

/// Maximum byte length of a string or binary component.
pub const MAX_MULTI_PART_LEN: usize = 0x3fff;

const TYPE_STRING: u8 = 0;
const TYPE_INT: u8 = 1;
const TYPE_LONG: u8 = 2;
const TYPE_BINARY: u8 = 3;

const SIGN32: u32 = 0x8000_0000;
const SIGN64: u64 = 0x8000_0000_0000_0000;

fn descriptor(kind: u8, len: usize) -> [u8; 2] {
    [(kind << 6) | ((len >> 8) & 0x3f) as u8, (len & 0xff) as u8]
}

fn checked_len(part: &KeyPart, len: usize) -> Result<usize> {
    if len > MAX_MULTI_PART_LEN {
        return Err(Error::malformed(format!(
            "multi key {} component of {} bytes exceeds {}",
            part.kind(),
            len,
            MAX_MULTI_PART_LEN
        )));
    }
    Ok(len)
}

/// Appends the multi-key encoding of `parts` to `out`.
///
/// An empty slice encodes to zero bytes. Null components are stored as
/// empty strings; text is always UTF-8.
pub fn encode_multi<S: ByteSink + ?Sized>(out: &mut S, parts: &[KeyPart]) -> Result<()> {
    if parts.is_empty() {
        return Ok(());
    }
    if parts.len() > MAX_MULTI_COMPONENTS {
        return Err(Error::malformed(format!(
            "multi key has {} components, limit is {}",
            parts.len(),
            MAX_MULTI_COMPONENTS
        )));
    }

    let mut descriptors = Vec::with_capacity(parts.len());
    for part in parts {
        let desc = match part {
            KeyPart::Null => descriptor(TYPE_STRING, 0),
            KeyPart::Str(s) => {
                let len = checked_len(part, s.len())?;
                out.put(s.as_bytes())?;
                descriptor(TYPE_STRING, len)
            }
            KeyPart::Bin(b) => {
                let len = checked_len(part, b.len())?;
                out.put(b)?;
                descriptor(TYPE_BINARY, len)
            }
            KeyPart::I32(v) => {
                out.put(&((*v as u32) ^ SIGN32).to_be_bytes())?;
                descriptor(TYPE_INT, 0)
            }
            KeyPart::F32(v) => {
                out.put(&(v.to_bits() ^ SIGN32).to_be_bytes())?;
                descriptor(TYPE_INT, 1)
            }
            KeyPart::I64(v) => {
                out.put(&((*v as u64) ^ SIGN64).to_be_bytes())?;
                descriptor(TYPE_LONG, 0)
            }
            KeyPart::F64(v) => {
                out.put(&(v.to_bits() ^ SIGN64).to_be_bytes())?;
                descriptor(TYPE_LONG, 1)
            }
            KeyPart::Multi(_) => {
                return Err(Error::malformed("multi keys cannot be nested"));
            }
        };
        descriptors.push(desc);
    }

    for desc in descriptors.iter().rev() {
        out.put(desc)?;
    }
    out.put_u8(parts.len() as u8)
}

/// Decodes a multi key.
pub fn decode_multi(bytes: &[u8]) -> Result<Vec<KeyPart>> {
    let Some((&count, body)) = bytes.split_last() else {
        return Ok(Vec::new());
    };
    let count = count as usize;
    let tail = count * 2;
    if count == 0 || tail > body.len() {
        return Err(Error::malformed(format!(
            "multi key of {} bytes cannot hold {} descriptors",
            bytes.len(),
            count
        )));
    }

    let payload_end = body.len() - tail;
    let mut payload = Reader::new(&body[..payload_end]);
    let mut parts = Vec::with_capacity(count);

    // Descriptor 0 sits right before the count byte.
    let mut end = body.len();
    for _ in 0..count {
        let (hi, lo) = (body[end - 2], body[end - 1]);
        end -= 2;
        let kind = hi >> 6;
        let len = (((hi & 0x3f) as usize) << 8) | lo as usize;

        let part = match (kind, len) {
            (TYPE_STRING, 0) => KeyPart::Str(String::new()),
            (TYPE_STRING, len) => {
                let raw = payload.read_bytes(len).map_err(|_| overrun(len))?;
                let text = std::str::from_utf8(raw)
                    .map_err(|e| Error::malformed(format!("multi key text: {}", e)))?;
                KeyPart::Str(text.to_owned())
            }
            (TYPE_BINARY, len) => {
                KeyPart::Bin(payload.read_bytes(len).map_err(|_| overrun(len))?.to_vec())
            }
            (TYPE_INT, flag @ (0 | 1)) => {
                let raw = payload.read_u32().map_err(|_| overrun(4))? ^ SIGN32;
                if flag == 0 {
                    KeyPart::I32(raw as i32)
                } else {
                    KeyPart::F32(f32::from_bits(raw))
                }
            }
            (TYPE_LONG, flag @ (0 | 1)) => {
                let raw = payload.read_u64().map_err(|_| overrun(8))? ^ SIGN64;
                if flag == 0 {
                    KeyPart::I64(raw as i64)
                } else {
                    KeyPart::F64(f64::from_bits(raw))
                }
            }
            (kind, len) => {
                return Err(Error::malformed(format!(
                    "invalid multi key descriptor (type {}, len {})",
                    kind, len
                )));
            }
        };
        parts.push(part);
    }

    if !payload.is_exhausted() {
        return Err(Error::malformed(format!(
            "{} unclaimed payload bytes in multi key",
            payload.remaining()
        )));
    }
    Ok(parts)
}

fn overrun(len: usize) -> Error {
    Error::malformed(format!("multi key component of {} bytes overruns payload", len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(parts: &[KeyPart]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_multi(&mut out, parts).unwrap();
        out
    }

    #[test]
    fn test_tail_layout() {
        let bytes = encode(&[KeyPart::from("ab"), KeyPart::I32(1)]);
        assert_eq!(
            bytes,
            vec![
                b'a', b'b', // payload 0
                0x80, 0, 0, 1, // payload 1
                0x40, 0x00, // descriptor 1 (int)
                0x00, 0x02, // descriptor 0 (string, 2 bytes)
                2,    // count
            ]
        );
    }

    #[test]
    fn test_roundtrip_mixed() {
        let parts = vec![
            KeyPart::from("user"),
            KeyPart::I64(-9),
            KeyPart::F64(2.5),
            KeyPart::from(""),
            KeyPart::F32(-1.0),
            KeyPart::Bin(vec![0, 255]),
            KeyPart::I32(i32::MAX),
        ];
        let bytes = encode(&parts);
        assert_eq!(decode_multi(&bytes).unwrap(), parts);
    }

    #[test]
    fn test_null_becomes_empty_string() {
        let bytes = encode(&[KeyPart::Null, KeyPart::I32(0)]);
        assert_eq!(decode_multi(&bytes).unwrap(), vec![KeyPart::from(""), KeyPart::I32(0)]);
    }

    #[test]
    fn test_empty() {
        assert!(encode(&[]).is_empty());
        assert!(decode_multi(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_long_descriptor_length() {
        let text = "z".repeat(0x1234);
        let bytes = encode(&[KeyPart::from(text.as_str())]);
        let n = bytes.len();
        assert_eq!(&bytes[n - 3..], &[0x12, 0x34, 1]);
        assert_eq!(decode_multi(&bytes).unwrap(), vec![KeyPart::Str(text)]);
    }

    #[test]
    fn test_limits() {
        let too_many = vec![KeyPart::I32(0); MAX_MULTI_COMPONENTS + 1];
        let mut out = Vec::new();
        assert!(matches!(encode_multi(&mut out, &too_many), Err(Error::MalformedComponent(_))));

        let max = vec![KeyPart::I32(0); MAX_MULTI_COMPONENTS];
        assert_eq!(decode_multi(&encode(&max)).unwrap().len(), MAX_MULTI_COMPONENTS);

        let long = KeyPart::Str("x".repeat(MAX_MULTI_PART_LEN + 1));
        assert!(encode_multi(&mut Vec::new(), &[long]).is_err());

        let nested = KeyPart::Multi(vec![]);
        assert!(encode_multi(&mut Vec::new(), &[nested]).is_err());
    }

    #[test]
    fn test_corrupt_tail() {
        // count claims more descriptors than bytes available
        assert!(decode_multi(&[0x00, 5]).is_err());
        // descriptor points past the payload
        assert!(decode_multi(&[b'a', 0x00, 0x05, 1]).is_err());
        // bad int flag
        assert!(decode_multi(&[0, 0, 0, 0, 0x40, 0x02, 1]).is_err());
        // payload bytes left over
        assert!(decode_multi(&[b'a', b'b', 0x00, 0x01, 1]).is_err());
        // zero count with trailing bytes
        assert!(decode_multi(&[1, 2, 0]).is_err());
    }

    #[test]
    fn test_prefix_of_payload_orders_integers() {
        let a = encode(&[KeyPart::I32(-5), KeyPart::from("x")]);
        let b = encode(&[KeyPart::I32(3), KeyPart::from("x")]);
        assert!(a[..4] < b[..4]);
    }
}
