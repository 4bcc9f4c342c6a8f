//! Decoded PHP values.

use std::collections::HashMap;
use std::fmt;

use memchr::memchr;

/// A decoded PHP value.
///
/// Values are built in one decode pass and own their children outright; there
/// are no shared or back-referenced nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// PHP null value.
    #[default]
    Null,

    /// PHP boolean value.
    Bool(bool),

    /// PHP integer value.
    Int(i64),

    /// PHP float value.
    Float(f64),

    /// PHP string value.
    Str(String),

    /// Array whose keys are exactly `0..n-1` in order.
    List(Vec<Value>),

    /// Any other array, keyed by string or stringified integer key.
    Map(HashMap<String, Value>),

    /// Object properties. The class name is validated but not kept.
    Object(HashMap<String, Value>),
}

impl Value {
    /// Check if the value is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the value as a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as an integer.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a float. Integers are not widened.
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the value as a string slice.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a list.
    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the value as an array map.
    #[inline]
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get the value as object properties.
    #[inline]
    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Get the field map of either a `Map` or an `Object`.
    #[inline]
    pub fn as_fields(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(fields) | Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a key in a `Map` or `Object`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_fields()?.get(key)
    }

    /// Get a type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(fields) => write_fields(f, "", fields),
            Value::Object(fields) => write_fields(f, "object", fields),
        }
    }
}

fn write_fields(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    fields: &HashMap<String, Value>,
) -> fmt::Result {
    // Sorted so output is stable across runs
    let mut entries: Vec<_> = fields.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    write!(f, "{}{{", prefix)?;
    for (i, (k, v)) in entries.into_iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{:?} => {}", k, v)?;
    }
    write!(f, "}}")
}

/// PHP property visibility, as encoded in an object's field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Public property, plain name.
    Public,
    /// Protected property (prefixed with `\0*\0`).
    Protected,
    /// Private property (prefixed with `\0ClassName\0`).
    Private,
}

/// Split a field key into visibility, declaring class and bare name.
///
/// Keys without a well-formed `\0...\0` prefix are public.
///
/// ```rust
/// use php_unserialize::{split_field_name, Visibility};
///
/// let (vis, class, name) = split_field_name("\0Demo\\Ns\\DemoA\0a");
/// assert_eq!(vis, Visibility::Private);
/// assert_eq!(class, Some("Demo\\Ns\\DemoA"));
/// assert_eq!(name, "a");
/// ```
pub fn split_field_name(key: &str) -> (Visibility, Option<&str>, &str) {
    let bytes = key.as_bytes();
    if bytes.first() != Some(&0) {
        return (Visibility::Public, None, key);
    }

    match memchr(0, &bytes[1..]) {
        Some(second) => {
            // Both NULs are single-byte, so these are char boundaries
            let prefix = &key[1..1 + second];
            let name = &key[2 + second..];
            if prefix == "*" {
                (Visibility::Protected, None, name)
            } else {
                (Visibility::Private, Some(prefix), name)
            }
        }
        None => (Visibility::Public, None, key),
    }
}

/// Build the key PHP uses for a private property of `class`.
pub fn private_field(class: &str, name: &str) -> String {
    format!("\0{}\0{}", class, name)
}

/// Build the key PHP uses for a protected property.
pub fn protected_field(name: &str) -> String {
    format!("\0*\0{}", name)
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{SerializeMap, SerializeSeq};

        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(fields) | Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
