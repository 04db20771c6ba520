// Key Ordering Tests for levelcodec
// Byte order of encoded keys must match the typed order of their components

use levelcodec::key::{decode_multi, encode_multi};
use levelcodec::{KeyCodec, KeyLayout, KeyPart};
use proptest::prelude::*;
use std::cmp::Ordering;

fn encode(layout: KeyLayout, first: KeyPart, second: KeyPart) -> Vec<u8> {
    KeyCodec::default().to_vec(layout, &first, &second).unwrap()
}

/// Typed order of a length-prefixed leading string: length, then bytes.
fn shortlex(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

proptest! {
    #[test]
    fn should_preserve_int32_order(a: i32, b: i32) {
        let ka = encode(KeyLayout::N32, a.into(), KeyPart::Null);
        let kb = encode(KeyLayout::N32, b.into(), KeyPart::Null);
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }

    #[test]
    fn should_preserve_int64_order(a: i64, b: i64) {
        let ka = encode(KeyLayout::N64, a.into(), KeyPart::Null);
        let kb = encode(KeyLayout::N64, b.into(), KeyPart::Null);
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }

    #[test]
    fn should_preserve_trailing_string_order(a in ".{0,12}", b in ".{0,12}") {
        let ka = encode(KeyLayout::Str, a.as_str().into(), KeyPart::Null);
        let kb = encode(KeyLayout::Str, b.as_str().into(), KeyPart::Null);
        prop_assert_eq!(ka.cmp(&kb), a.as_bytes().cmp(b.as_bytes()));
    }

    #[test]
    fn should_preserve_int64_string_pair_order(a: i64, b: i64, sa in "[a-zé]{0,6}", sb in "[a-zé]{0,6}") {
        let ka = encode(KeyLayout::N64Str, a.into(), sa.as_str().into());
        let kb = encode(KeyLayout::N64Str, b.into(), sb.as_str().into());
        let expected = a.cmp(&b).then_with(|| sa.as_bytes().cmp(sb.as_bytes()));
        prop_assert_eq!(ka.cmp(&kb), expected);
    }

    #[test]
    fn should_order_leading_strings_shortlex(sa in "[a-c]{0,5}", sb in "[a-c]{0,5}", a: i32, b: i32) {
        let ka = encode(KeyLayout::StrN32, sa.as_str().into(), a.into());
        let kb = encode(KeyLayout::StrN32, sb.as_str().into(), b.into());
        let expected = shortlex(&sa, &sb).then_with(|| a.cmp(&b));
        prop_assert_eq!(ka.cmp(&kb), expected);
    }

    #[test]
    fn should_compare_naturally_with_comparator(sa in "[a-c]{0,5}", sb in "[a-c]{0,5}", a: i32, b: i32) {
        let ka = encode(KeyLayout::StrN32, sa.as_str().into(), a.into());
        let kb = encode(KeyLayout::StrN32, sb.as_str().into(), b.into());
        let expected = sa.as_bytes().cmp(sb.as_bytes()).then_with(|| a.cmp(&b));
        prop_assert_eq!(KeyLayout::StrN32.compare(&ka, &kb), expected);
    }

    #[test]
    fn should_roundtrip_every_pair_layout(n32: i32, n64: i64, s in "\\PC{0,8}", bin: Vec<u8>) {
        let codec = KeyCodec::default();
        for layout in KeyLayout::ALL.iter().copied().filter(|l| l.is_two_key()) {
            let part = |name: &str| -> KeyPart {
                match name {
                    "Str" => s.as_str().into(),
                    "N32" => n32.into(),
                    "N64" => n64.into(),
                    _ => bin.clone().into(),
                }
            };
            let (first_name, second_name) = component_names(layout);
            let (first, second) = (part(first_name), part(second_name));
            let bytes = codec.to_vec(layout, &first, &second).unwrap();
            prop_assert_eq!(codec.decode(layout, &bytes).unwrap(), (first, second));
            // re-encoding the decoded key reproduces the bytes
            let (d1, d2) = codec.decode(layout, &bytes).unwrap();
            prop_assert_eq!(codec.to_vec(layout, &d1, &d2).unwrap(), bytes);
        }
    }

    #[test]
    fn should_roundtrip_multi_keys(ints in proptest::collection::vec(any::<i64>(), 0..6), text in "[a-z]{0,10}") {
        let mut parts: Vec<KeyPart> = ints.into_iter().map(KeyPart::I64).collect();
        parts.push(KeyPart::Str(text));
        let mut out = Vec::new();
        encode_multi(&mut out, &parts).unwrap();
        prop_assert_eq!(decode_multi(&out).unwrap(), parts);
    }
}

fn component_names(layout: KeyLayout) -> (&'static str, &'static str) {
    use levelcodec::key::{Component, Shape};
    let name = |c: Component| match c {
        Component::Str => "Str",
        Component::N32 => "N32",
        Component::N64 => "N64",
        Component::Bin => "Bin",
    };
    match layout.shape() {
        Shape::Pair(a, b) => (name(a), name(b)),
        _ => unreachable!("pair layouts only"),
    }
}

/// Test the ordering scenario for signed two-keys
#[test]
fn test_negative_sorts_before_positive() {
    let low = encode(KeyLayout::N64Str, KeyPart::I64(-42), "café".into());
    let high = encode(KeyLayout::N64Str, KeyPart::I64(41), "café".into());
    assert!(low < high);
}

/// Test null components encode as their zero value
#[test]
fn test_null_components_sort_as_zero() {
    let null = encode(KeyLayout::N32N32, KeyPart::Null, KeyPart::Null);
    let zero = encode(KeyLayout::N32N32, KeyPart::I32(0), KeyPart::I32(0));
    assert_eq!(null, zero);
}

/// Test free keys keep raw byte order
#[test]
fn test_free_layout_is_verbatim() {
    let key = encode(KeyLayout::Free, KeyPart::Bin(vec![3, 1, 2]), KeyPart::Null);
    assert_eq!(key, vec![3, 1, 2]);
    let (first, _) = KeyCodec::default().decode(KeyLayout::Free, &key).unwrap();
    assert_eq!(first, KeyPart::Bin(vec![3, 1, 2]));
}
