//! Conversion between [`Value`] and `serde_json::Value`.
//!
//! JSON has fewer kinds than the codec, so `to_json` is lossy: arrays of any
//! element type become JSON arrays, dates become their millisecond instant,
//! byte strings become arrays of numbers. `from_json` always yields the
//! narrowest matching kind (`I32` before `I64`).

use super::{KeyArray, Value, ValueMap};
use crate::key::KeyPart;
use crate::Result;
use serde_json::{Map, Number, Value as JsonValue};

/// Converts a JSON document into a value.
pub fn from_json(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => number(n),
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(from_json).collect()),
        JsonValue::Object(fields) => Value::Map(
            fields.iter().map(|(k, v)| (Value::Str(k.clone()), from_json(v))).collect(),
        ),
    }
}

fn number(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        return match i32::try_from(i) {
            Ok(small) => Value::I32(small),
            Err(_) => Value::I64(i),
        };
    }
    if let Some(u) = n.as_u64() {
        return Value::BigInt(u.to_string());
    }
    n.as_f64().map_or(Value::Null, Value::F64)
}

/// Parses JSON text into a value.
pub fn from_json_str(text: &str) -> Result<Value> {
    let json: JsonValue = serde_json::from_str(text)?;
    Ok(from_json(&json))
}

/// Converts a value into its closest JSON form.
pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Str(s) | Value::Decimal(s) | Value::BigInt(s) => JsonValue::String(s.clone()),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Char(c) => JsonValue::String(c.to_string()),
        Value::I8(v) => (*v).into(),
        Value::I16(v) => (*v).into(),
        Value::I32(v) | Value::AtomicI32(v) => (*v).into(),
        Value::I64(v) | Value::AtomicI64(v) => (*v).into(),
        Value::F32(v) => float(*v as f64),
        Value::F64(v) => float(*v),
        Value::Date(_, millis) => (*millis).into(),
        Value::BoolArray(items) => items.iter().map(|b| JsonValue::Bool(*b)).collect(),
        Value::Bytes(bytes) | Value::Opaque(bytes) => bytes.iter().map(|b| JsonValue::from(*b)).collect(),
        Value::CharArray(items) => items.iter().map(|c| JsonValue::String(c.to_string())).collect(),
        Value::ShortArray(items) => items.iter().map(|v| JsonValue::from(*v)).collect(),
        Value::IntArray(items) => items.iter().map(|v| JsonValue::from(*v)).collect(),
        Value::LongArray(items) => items.iter().map(|v| JsonValue::from(*v)).collect(),
        Value::FloatArray(items) => items.iter().map(|v| float(*v as f64)).collect(),
        Value::DoubleArray(items) => items.iter().map(|v| float(*v)).collect(),
        Value::StringArray(items) => items.iter().map(|s| JsonValue::String(s.clone())).collect(),
        Value::Array { items, .. } | Value::List(items) => items.iter().map(to_json).collect(),
        Value::Set(set) => set.iter().map(to_json).collect(),
        Value::Map(map) => map_to_json(map),
        Value::KeyArray(array) => key_array_to_json(array),
        Value::TwoKey(key) => {
            JsonValue::Array(vec![key_part(key.first()), key_part(key.second())])
        }
        Value::Extension { code, data } => {
            let mut fields = Map::new();
            fields.insert("code".to_owned(), (*code).into());
            fields.insert("data".to_owned(), data.iter().map(|b| JsonValue::from(*b)).collect());
            JsonValue::Object(fields)
        }
    }
}

/// Serializes a value as JSON text.
pub fn to_json_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(&to_json(value))?)
}

fn float(v: f64) -> JsonValue {
    Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number)
}

fn map_to_json(map: &ValueMap) -> JsonValue {
    let mut fields = Map::new();
    for (k, v) in map.iter() {
        fields.insert(key_string(k), to_json(v));
    }
    JsonValue::Object(fields)
}

fn key_array_to_json(array: &KeyArray) -> JsonValue {
    let mut fields = Map::new();
    for (k, v) in array.iter() {
        fields.insert(key_string(&k.to_value()), to_json(v));
    }
    JsonValue::Object(fields)
}

fn key_string(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        other => to_json(other).to_string(),
    }
}

fn key_part(part: &KeyPart) -> JsonValue {
    match part {
        KeyPart::Null => JsonValue::Null,
        KeyPart::Str(s) => JsonValue::String(s.clone()),
        KeyPart::I32(v) => (*v).into(),
        KeyPart::I64(v) => (*v).into(),
        KeyPart::F32(v) => float(*v as f64),
        KeyPart::F64(v) => float(*v),
        KeyPart::Bin(bytes) => bytes.iter().map(|b| JsonValue::from(*b)).collect(),
        KeyPart::Multi(parts) => parts.iter().map(key_part).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyLayout, TwoKey};
    use crate::value::DateKind;
    use serde_json::json;

    #[test]
    fn test_from_json_document() {
        let value = from_json(&json!({"a": 1, "b": [true, "x"], "big": 5_000_000_000i64, "f": 0.5}));
        let Value::Map(map) = value else { panic!("expected map") };
        assert_eq!(map.get_str("a"), Some(&Value::I32(1)));
        assert_eq!(map.get_str("b"), Some(&Value::list(vec![true.into(), "x".into()])));
        assert_eq!(map.get_str("big"), Some(&Value::I64(5_000_000_000)));
        assert_eq!(map.get_str("f"), Some(&Value::F64(0.5)));
    }

    #[test]
    fn test_u64_beyond_i64_becomes_big_integer() {
        assert_eq!(from_json(&json!(u64::MAX)), Value::BigInt(u64::MAX.to_string()));
    }

    #[test]
    fn test_to_json_lossy_kinds() {
        assert_eq!(to_json(&Value::Date(DateKind::Timestamp, 1234)), json!(1234));
        assert_eq!(to_json(&Value::Bytes(vec![1, 2])), json!([1, 2]));
        assert_eq!(to_json(&Value::F64(f64::NAN)), JsonValue::Null);
        assert_eq!(to_json(&Value::Char('z')), json!("z"));

        let key = TwoKey::new(KeyLayout::N64Str, -42i64, "café").unwrap();
        assert_eq!(to_json(&Value::TwoKey(key)), json!([-42, "café"]));
    }

    #[test]
    fn test_non_string_map_keys_are_stringified() {
        let value = Value::map(vec![(Value::I32(7), Value::Bool(true))]);
        assert_eq!(to_json(&value), json!({"7": true}));
    }

    #[test]
    fn test_text_roundtrip() {
        let value = from_json_str(r#"{"a":1,"b":[true,"x"]}"#).unwrap();
        assert_eq!(to_json_string(&value).unwrap(), r#"{"a":1,"b":[true,"x"]}"#);
        assert!(matches!(from_json_str("{"), Err(crate::Error::Serialization(_))));
    }
}
