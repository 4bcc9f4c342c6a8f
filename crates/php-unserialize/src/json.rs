//! JSON conversion for decoded values.
//!
//! Enable the `serde` feature to use this module.

use serde_json::{json, Map, Value as JsonValue};

use crate::value::{split_field_name, Value, Visibility};

/// Convert a decoded value to a JSON value.
///
/// # Mapping Rules
///
/// | Value | JSON Type |
/// |-------|-----------|
/// | `Null` | `null` |
/// | `Bool` | `boolean` |
/// | `Int` | `number` |
/// | `Float` | `number` (`null` for NaN, `"Infinity"`/`"-Infinity"`) |
/// | `Str` | `string` |
/// | `List` | `array` |
/// | `Map` | `object` |
/// | `Object` | `object`, private keys as `Class::name`, protected as `*name` |
///
/// # Example
///
/// ```rust
/// use php_unserialize::{decode, to_json};
///
/// let data = br#"a:2:{s:4:"name";s:5:"Alice";s:3:"age";i:30;}"#;
/// let value = decode(data).unwrap();
/// assert_eq!(to_json(&value), serde_json::json!({"name": "Alice", "age": 30}));
/// ```
pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => json!(*i),
        Value::Float(f) => {
            if f.is_nan() {
                JsonValue::Null
            } else if f.is_infinite() {
                if f.is_sign_positive() {
                    json!("Infinity")
                } else {
                    json!("-Infinity")
                }
            } else {
                json!(*f)
            }
        }
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::List(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        Value::Map(fields) => {
            let map: Map<String, JsonValue> = fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect();
            JsonValue::Object(map)
        }
        Value::Object(fields) => {
            let mut map = Map::new();
            for (key, value) in fields {
                let key = match split_field_name(key) {
                    (Visibility::Private, Some(class), name) => format!("{}::{}", class, name),
                    (Visibility::Protected, _, name) => format!("*{}", name),
                    _ => key.clone(),
                };
                map.insert(key, to_json(value));
            }
            JsonValue::Object(map)
        }
    }
}

/// Convert a decoded value to a JSON string.
///
/// # Example
///
/// ```rust
/// use php_unserialize::{decode, json::to_json_string};
///
/// let value = decode(br#"a:2:{i:0;s:1:"a";i:1;i:2;}"#).unwrap();
/// assert_eq!(to_json_string(&value).unwrap(), r#"["a",2]"#);
/// ```
pub fn to_json_string(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string(&to_json(value))
}

/// Convert a decoded value to a pretty-printed JSON string.
pub fn to_json_string_pretty(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_json(value))
}

#[cfg(test)]
#[allow(clippy::approx_constant)]
mod tests {
    use super::*;
    use crate::decode;

    #[test]
    fn test_simple_types() {
        assert_eq!(to_json(&Value::Null), JsonValue::Null);
        assert_eq!(to_json(&Value::Bool(true)), JsonValue::Bool(true));
        assert_eq!(to_json(&Value::Int(42)), json!(42));
        assert_eq!(to_json(&Value::Float(3.14)), json!(3.14));
        assert_eq!(to_json(&Value::Float(f64::NAN)), JsonValue::Null);
        assert_eq!(to_json(&Value::Float(f64::NEG_INFINITY)), json!("-Infinity"));
    }

    #[test]
    fn test_list_and_map() {
        let value = decode(b"a:2:{i:0;s:3:\"foo\";i:1;s:3:\"bar\";}").unwrap();
        assert_eq!(to_json(&value), json!(["foo", "bar"]));

        let value = decode(b"a:2:{i:0;s:3:\"foo\";i:5;s:3:\"bar\";}").unwrap();
        assert_eq!(to_json(&value), json!({"0": "foo", "5": "bar"}));
    }

    #[test]
    fn test_object_keys_by_visibility() {
        let data = b"O:4:\"Test\":3:{s:3:\"pub\";i:1;s:10:\"\x00Test\x00priv\";i:2;s:7:\"\x00*\x00prot\";i:3;}";
        let value = decode(data).unwrap();
        assert_eq!(
            to_json(&value),
            json!({"pub": 1, "Test::priv": 2, "*prot": 3})
        );
    }

    #[test]
    fn test_serialize_keeps_raw_keys() {
        let value = decode(b"O:4:\"Test\":1:{s:7:\"\x00*\x00prot\";a:1:{i:0;N;}}").unwrap();
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"\u{0}*\u{0}prot": [null]})
        );
    }
}
