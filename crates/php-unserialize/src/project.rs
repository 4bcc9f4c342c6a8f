//! Typed projection of decoded values onto Rust records.
//!
//! A target type describes itself with a static table of
//! [`FieldDescriptor`]s: the key to look up in the source map and an accessor
//! for the field it fills. The projector walks that table, copies values whose
//! shape matches the field, and leaves everything else untouched.
//!
//! Only structural misuse is an error. A missing key or a value of the wrong
//! kind simply leaves the field at whatever it held before.
//!
//! # Example
//!
//! ```rust
//! use php_unserialize::{decode_into, php_record};
//!
//! #[derive(Default)]
//! struct User {
//!     name: String,
//!     age: i64,
//!     secret: String,
//! }
//!
//! php_record!(User {
//!     name => "name",
//!     age => "age",
//!     secret => "\0User\0secret",
//! });
//!
//! let mut user = User::default();
//! decode_into(br#"a:2:{s:4:"name";s:5:"Alice";s:3:"age";i:30;}"#, &mut user).unwrap();
//! assert_eq!(user.name, "Alice");
//! assert_eq!(user.age, 30);
//! assert_eq!(user.secret, "");
//! ```

use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::{instrument, trace};

use crate::error::ProjectError;
use crate::value::Value;

/// Maximum nesting depth for nested records.
const MAX_DEPTH: usize = 512;

/// Declared kind of a target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Filled from [`Value::Int`].
    Integer,
    /// Filled from [`Value::Float`].
    Float,
    /// Filled from [`Value::Str`].
    String,
    /// Filled from [`Value::Bool`].
    Bool,
    /// Filled from [`Value::List`].
    Sequence,
    /// Filled from [`Value::Map`].
    Mapping,
    /// Filled recursively from [`Value::Map`] or [`Value::Object`].
    Aggregate,
}

/// One entry of a record's field table.
pub struct FieldDescriptor<T> {
    /// Source key, matched exactly. Non-public PHP properties need their
    /// mangled form, e.g. `"\0Class\0name"` or `"\0*\0name"`.
    pub tag: &'static str,
    /// Borrow the field out of a target instance.
    pub access: fn(&mut T) -> &mut dyn Slot,
}

impl<T> FieldDescriptor<T> {
    /// Declared kind of this field.
    pub fn kind(&self, target: &mut T) -> FieldKind {
        (self.access)(target).kind()
    }
}

/// A record type that can be filled by the projector.
///
/// Usually implemented with [`php_record!`](crate::php_record).
pub trait Record: Sized + 'static {
    /// Field table, in projection order.
    const FIELDS: &'static [FieldDescriptor<Self>];
}

/// A field that can receive a decoded value.
pub trait Slot {
    /// Declared kind of the field.
    fn kind(&self) -> FieldKind;

    /// Copy `value` into the field if its shape matches.
    ///
    /// Returns `Ok(false)` when the value was skipped.
    fn assign(&mut self, value: &Value, scope: &Scope<'_>) -> Result<bool, ProjectError>;
}

/// Element of a sequence or mapping field.
///
/// Conversion is shallow: the value must already have the element's kind.
pub trait Element: Sized {
    /// Convert a value, or `None` if its kind doesn't match.
    fn from_value(value: &Value) -> Option<Self>;
}

impl Element for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl Element for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl Element for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Element for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl Element for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

macro_rules! scalar_slot {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl Slot for $ty {
            fn kind(&self) -> FieldKind {
                FieldKind::$kind
            }

            fn assign(&mut self, value: &Value, _scope: &Scope<'_>) -> Result<bool, ProjectError> {
                match value {
                    Value::$variant(v) => {
                        *self = v.clone();
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }
    };
}

scalar_slot!(i64, Integer, Int);
scalar_slot!(f64, Float, Float);
scalar_slot!(String, String, Str);
scalar_slot!(bool, Bool, Bool);

impl<E: Element> Slot for Vec<E> {
    fn kind(&self) -> FieldKind {
        FieldKind::Sequence
    }

    fn assign(&mut self, value: &Value, _scope: &Scope<'_>) -> Result<bool, ProjectError> {
        let Value::List(items) = value else {
            return Ok(false);
        };
        match items.iter().map(E::from_value).collect::<Option<Vec<_>>>() {
            Some(converted) => {
                *self = converted;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<V: Element> Slot for HashMap<String, V> {
    fn kind(&self) -> FieldKind {
        FieldKind::Mapping
    }

    fn assign(&mut self, value: &Value, _scope: &Scope<'_>) -> Result<bool, ProjectError> {
        let Value::Map(entries) = value else {
            return Ok(false);
        };
        let converted = entries
            .iter()
            .map(|(k, v)| V::from_value(v).map(|v| (k.clone(), v)))
            .collect::<Option<HashMap<_, _>>>();
        match converted {
            Some(converted) => {
                *self = converted;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Projector configuration options.
#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// Maximum nesting depth for nested records.
    pub max_depth: usize,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }
}

/// Copies decoded values into records.
#[derive(Debug, Clone, Default)]
pub struct Projector {
    config: ProjectorConfig,
}

impl Projector {
    /// Create a projector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a projector with custom configuration.
    pub fn with_config(config: ProjectorConfig) -> Self {
        Self { config }
    }

    /// Fill `target` from a decoded root value.
    ///
    /// The root must be a [`Value::Map`] or [`Value::Object`].
    #[cfg_attr(feature = "tracing", instrument(skip_all, fields(root = root.type_name())))]
    pub fn project<T: Record>(&self, root: &Value, target: &mut T) -> Result<(), ProjectError> {
        let source = root.as_fields().ok_or(ProjectError::RootShapeMismatch {
            found: root.type_name(),
        })?;
        self.project_fields(source, target, 1)
    }

    fn project_fields<T: Record>(
        &self,
        source: &HashMap<String, Value>,
        target: &mut T,
        depth: usize,
    ) -> Result<(), ProjectError> {
        if depth > self.config.max_depth {
            return Err(ProjectError::MaxDepthExceeded(self.config.max_depth));
        }

        let scope = Scope {
            projector: self,
            depth,
        };
        for field in T::FIELDS {
            let Some(value) = source.get(field.tag) else {
                #[cfg(feature = "tracing")]
                trace!(tag = field.tag, "Field absent from source");
                continue;
            };

            let slot = (field.access)(target);
            let assigned = slot.assign(value, &scope)?;
            trace_field(field.tag, slot, value, assigned);
        }
        Ok(())
    }
}

#[cfg(feature = "tracing")]
fn trace_field(tag: &str, slot: &dyn Slot, value: &Value, assigned: bool) {
    if assigned {
        trace!(tag, kind = ?slot.kind(), "Field projected");
    } else {
        trace!(
            tag,
            kind = ?slot.kind(),
            found = value.type_name(),
            "Field skipped on kind mismatch"
        );
    }
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
fn trace_field(_tag: &str, _slot: &dyn Slot, _value: &Value, _assigned: bool) {}

/// Projection state handed to [`Slot::assign`].
pub struct Scope<'p> {
    projector: &'p Projector,
    depth: usize,
}

impl Scope<'_> {
    /// Current nesting depth, 1 for the root record.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Fill a nested record from `value`, in place.
    ///
    /// Returns `Ok(false)` when `value` is not a map or object.
    pub fn nested<R: Record>(&self, value: &Value, target: &mut R) -> Result<bool, ProjectError> {
        let Some(source) = value.as_fields() else {
            return Ok(false);
        };
        self.projector
            .project_fields(source, target, self.depth + 1)?;
        Ok(true)
    }
}

/// Implement [`Record`] and [`Slot`] for a struct from `field => "tag"` pairs.
///
/// Every listed field's type must implement [`Slot`]. Types declared with this
/// macro can themselves be used as nested fields.
///
/// ```rust
/// use std::collections::HashMap;
/// use php_unserialize::php_record;
///
/// #[derive(Default)]
/// struct Inner {
///     id: i64,
/// }
/// php_record!(Inner { id => "id" });
///
/// #[derive(Default)]
/// struct Outer {
///     inner: Inner,
///     tags: Vec<String>,
///     extra: HashMap<String, i64>,
/// }
/// php_record!(Outer {
///     inner => "inner",
///     tags => "\0*\0tags",
///     extra => "extra",
/// });
/// ```
#[macro_export]
macro_rules! php_record {
    ($ty:ty { $($field:ident => $tag:expr),* $(,)? }) => {
        impl $crate::Record for $ty {
            const FIELDS: &'static [$crate::FieldDescriptor<Self>] = &[
                $($crate::FieldDescriptor {
                    tag: $tag,
                    access: |target| &mut target.$field,
                },)*
            ];
        }

        impl $crate::Slot for $ty {
            fn kind(&self) -> $crate::FieldKind {
                $crate::FieldKind::Aggregate
            }

            fn assign(
                &mut self,
                value: &$crate::Value,
                scope: &$crate::Scope<'_>,
            ) -> ::core::result::Result<bool, $crate::ProjectError> {
                scope.nested(value, self)
            }
        }
    };
}

/// Fill `target` from a decoded root value with default configuration.
#[inline]
pub fn project<T: Record>(root: &Value, target: &mut T) -> Result<(), ProjectError> {
    Projector::new().project(root, target)
}
