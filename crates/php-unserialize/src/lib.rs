//! Decoder for PHP's `serialize()` format with typed projection.
//!
//! Decoding turns a complete input buffer into a [`Value`] tree. Projection
//! then copies matching entries of that tree into a Rust struct described by a
//! static field table, skipping anything that is missing or of another kind.
//!
//! # Quick Start
//!
//! ```rust
//! use php_unserialize::{decode, Value};
//!
//! let data = br#"O:4:"Demo":1:{s:1:"a";s:3:"abc";}"#;
//! let value = decode(data).unwrap();
//! assert_eq!(value.get("a"), Some(&Value::Str("abc".into())));
//! ```
//!
//! # Typed Projection
//!
//! ```rust
//! use std::collections::HashMap;
//! use php_unserialize::{decode_into, php_record, private_field};
//!
//! #[derive(Default)]
//! struct DemoA {
//!     a: String,
//!     b: i64,
//!     m: HashMap<String, php_unserialize::Value>,
//! }
//!
//! php_record!(DemoA {
//!     a => "\0Demo\\Ns\\DemoA\0a",
//!     b => "b",
//!     m => "m",
//! });
//!
//! let data = b"O:13:\"Demo\\Ns\\DemoA\":3:{s:16:\"\0Demo\\Ns\\DemoA\0a\";s:3:\"123\";s:1:\"b\";i:3434;s:1:\"m\";a:1:{s:1:\"c\";s:1:\"f\";}}";
//! let mut demo = DemoA::default();
//! decode_into(data, &mut demo).unwrap();
//! assert_eq!(demo.a, "123");
//! assert_eq!(demo.b, 3434);
//! assert_eq!(private_field("Demo\\Ns\\DemoA", "a"), "\0Demo\\Ns\\DemoA\0a");
//! ```
//!
//! # Supported Types
//!
//! | PHP Type | Rust Type |
//! |----------|-----------|
//! | `null` | `Value::Null` |
//! | `bool` | `Value::Bool(bool)` |
//! | `int` | `Value::Int(i64)` |
//! | `float` | `Value::Float(f64)` |
//! | `string` | `Value::Str(String)` |
//! | `array` (keys `0..n-1`) | `Value::List(Vec<Value>)` |
//! | `array` (other keys) | `Value::Map(HashMap<String, Value>)` |
//! | `object` | `Value::Object(HashMap<String, Value>)` |
//!
//! References (`r`/`R`), custom-serialized objects (`C`) and enums (`E`) are
//! rejected with [`ErrorKind::UnsupportedType`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::inline_always)]
#![allow(clippy::float_cmp)]

pub mod decoder;
pub mod error;
pub mod project;
pub mod value;

#[cfg(feature = "serde")]
pub mod json;

pub use decoder::{decode, decode_with_config, Decoder, DecoderConfig};
pub use error::{DecodeError, Error, ErrorKind, ProjectError, Result};
pub use project::{
    project, Element, FieldDescriptor, FieldKind, Projector, ProjectorConfig, Record, Scope, Slot,
};
pub use value::{private_field, protected_field, split_field_name, Value, Visibility};

#[cfg(feature = "serde")]
pub use json::to_json;

/// Decode `data` and project the result onto `target`.
///
/// Decode errors and structural projection errors are both returned; fields
/// that are missing or of another kind are left untouched.
pub fn decode_into<T: Record>(data: &[u8], target: &mut T) -> Result<()> {
    let value = decode(data)?;
    project(&value, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Pair {
        a: String,
        b: i64,
    }

    crate::php_record!(Pair { a => "a", b => "b" });

    #[test]
    fn test_decode_into() {
        let mut pair = Pair::default();
        decode_into(br#"a:2:{s:1:"a";s:1:"x";s:1:"b";i:2;}"#, &mut pair).unwrap();
        assert_eq!(pair.a, "x");
        assert_eq!(pair.b, 2);
    }

    #[test]
    fn test_decode_into_reports_decode_error() {
        let mut pair = Pair::default();
        let err = decode_into(br#"a:1:{s:1:"a";s:1:"x";"#, &mut pair).unwrap_err();
        assert!(matches!(err, Error::Decode(ref e) if e.kind == ErrorKind::UnexpectedEof));
        assert_eq!(pair.a, "");
    }

    #[test]
    fn test_decode_into_reports_root_shape() {
        let mut pair = Pair::default();
        let err = decode_into(b"s:1:\"a\";", &mut pair).unwrap_err();
        assert_eq!(
            err,
            Error::Project(ProjectError::RootShapeMismatch { found: "string" })
        );
    }
}
