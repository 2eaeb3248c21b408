//! Generic structured values and leaf coercions.
//!
//! The document model is [`serde_json::Value`]. This module wraps the parser
//! and serializer, and defines [`FieldValue`], the capability every field type
//! must have: convert from a document node and back. Primitive and collection
//! types are implemented here; component types get their implementation from
//! the [`component!`](crate::component!) macro, which also marks them as
//! nested.

use std::collections::{BTreeMap, HashMap};

use crate::{BindError, FieldPath};

pub use serde_json::Value;

// ---------------------------------------------------------------------------
// Text <-> Value
// ---------------------------------------------------------------------------

/// Parse document text into a [`Value`].
pub fn parse(text: &str) -> Result<Value, BindError> {
    Ok(serde_json::from_str(text)?)
}

/// Render a [`Value`] as text, indented with two spaces when `pretty`.
pub fn serialize(value: &Value, pretty: bool) -> String {
    if pretty {
        format!("{value:#}")
    } else {
        value.to_string()
    }
}

/// Short name of a value's kind, used in error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// DecodeContext
// ---------------------------------------------------------------------------

/// Per-call decoding state threaded through nested component decodes.
///
/// Tracks how many component descriptors are currently on the stack so that
/// a configured depth limit can stop pathologically deep documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
    depth: usize,
    max_depth: Option<usize>,
}

impl DecodeContext {
    /// A context at the document root. `None` means no depth limit.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Number of component decodes currently in progress.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Enter one more level of component nesting.
    pub fn descend(self) -> Result<Self, BindError> {
        let depth = self.depth + 1;
        match self.max_depth {
            Some(limit) if depth > limit => Err(BindError::DepthExceeded {
                path: FieldPath::new(),
                limit,
            }),
            _ => Ok(Self { depth, ..self }),
        }
    }
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self::unbounded()
    }
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A type that can be stored in a component field.
///
/// `NESTED` is `true` for component types (decoded through their own
/// descriptor) and for containers of them.
pub trait FieldValue: Sized {
    const NESTED: bool = false;

    /// Coerce a document node into `Self`.
    fn from_value(value: &Value, ctx: DecodeContext) -> Result<Self, BindError>;

    /// Render `self` as a document node.
    fn to_value(&self) -> Value;
}

impl FieldValue for Value {
    fn from_value(value: &Value, _ctx: DecodeContext) -> Result<Self, BindError> {
        Ok(value.clone())
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FieldValue for bool {
    fn from_value(value: &Value, _ctx: DecodeContext) -> Result<Self, BindError> {
        value
            .as_bool()
            .ok_or_else(|| BindError::type_mismatch("boolean", value))
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for String {
    fn from_value(value: &Value, _ctx: DecodeContext) -> Result<Self, BindError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| BindError::type_mismatch("string", value))
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FieldValue for f64 {
    fn from_value(value: &Value, _ctx: DecodeContext) -> Result<Self, BindError> {
        value
            .as_f64()
            .ok_or_else(|| BindError::type_mismatch("f64", value))
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for f32 {
    fn from_value(value: &Value, _ctx: DecodeContext) -> Result<Self, BindError> {
        value
            .as_f64()
            .map(|v| v as f32)
            .filter(|v| v.is_finite())
            .ok_or_else(|| BindError::type_mismatch("f32", value))
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

macro_rules! impl_signed_field_value {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn from_value(value: &Value, _ctx: DecodeContext) -> Result<Self, BindError> {
                value
                    .as_i64()
                    .and_then(|v| <$ty>::try_from(v).ok())
                    .ok_or_else(|| BindError::type_mismatch(stringify!($ty), value))
            }

            fn to_value(&self) -> Value {
                Value::from(*self)
            }
        }
    )*};
}

macro_rules! impl_unsigned_field_value {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn from_value(value: &Value, _ctx: DecodeContext) -> Result<Self, BindError> {
                value
                    .as_u64()
                    .and_then(|v| <$ty>::try_from(v).ok())
                    .ok_or_else(|| BindError::type_mismatch(stringify!($ty), value))
            }

            fn to_value(&self) -> Value {
                Value::from(*self)
            }
        }
    )*};
}

impl_signed_field_value!(i8, i16, i32, i64);
impl_unsigned_field_value!(u8, u16, u32, u64);

impl<T: FieldValue> FieldValue for Option<T> {
    const NESTED: bool = T::NESTED;

    /// `null` decodes to `None`. The key itself is still required.
    fn from_value(value: &Value, ctx: DecodeContext) -> Result<Self, BindError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, ctx).map(Some),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FieldValue> FieldValue for Box<T> {
    const NESTED: bool = T::NESTED;

    fn from_value(value: &Value, ctx: DecodeContext) -> Result<Self, BindError> {
        T::from_value(value, ctx).map(Box::new)
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const NESTED: bool = T::NESTED;

    fn from_value(value: &Value, ctx: DecodeContext) -> Result<Self, BindError> {
        let items = value
            .as_array()
            .ok_or_else(|| BindError::type_mismatch("array", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_value(item, ctx).map_err(|e| e.at(format!("[{i}]"))))
            .collect()
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::to_value).collect())
    }
}

impl<T: FieldValue, const N: usize> FieldValue for [T; N] {
    const NESTED: bool = T::NESTED;

    fn from_value(value: &Value, ctx: DecodeContext) -> Result<Self, BindError> {
        let items: Vec<T> = Vec::from_value(value, ctx)?;
        let found = items.len();
        items.try_into().map_err(|_| BindError::TypeMismatch {
            path: FieldPath::new(),
            expected: format!("array of length {N}"),
            actual: if found < N { "shorter array" } else { "longer array" },
        })
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::to_value).collect())
    }
}

impl<T: FieldValue> FieldValue for BTreeMap<String, T> {
    const NESTED: bool = T::NESTED;

    fn from_value(value: &Value, ctx: DecodeContext) -> Result<Self, BindError> {
        let object = value
            .as_object()
            .ok_or_else(|| BindError::type_mismatch("object", value))?;
        object
            .iter()
            .map(|(key, item)| {
                T::from_value(item, ctx)
                    .map(|v| (key.clone(), v))
                    .map_err(|e| e.at(key.as_str()))
            })
            .collect()
    }

    fn to_value(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, item)| (key.clone(), item.to_value()))
                .collect(),
        )
    }
}

impl<T: FieldValue> FieldValue for HashMap<String, T> {
    const NESTED: bool = T::NESTED;

    fn from_value(value: &Value, ctx: DecodeContext) -> Result<Self, BindError> {
        BTreeMap::<String, T>::from_value(value, ctx).map(|map| map.into_iter().collect())
    }

    fn to_value(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, item)| (key.clone(), item.to_value()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode<T: FieldValue>(value: Value) -> Result<T, BindError> {
        T::from_value(&value, DecodeContext::unbounded())
    }

    #[test]
    fn parse_reports_malformed_text() {
        let err = parse("{\"Wizard1\": ").unwrap_err();
        assert!(matches!(err, BindError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse document"));
    }

    #[test]
    fn serialize_compact_and_pretty() {
        let value = json!({"x": 1});
        assert_eq!(serialize(&value, false), "{\"x\":1}");
        assert_eq!(serialize(&value, true), "{\n  \"x\": 1\n}");
    }

    #[test]
    fn numbers_accept_integers_as_floats() {
        assert_eq!(decode::<f64>(json!(15)).unwrap(), 15.0);
        assert_eq!(decode::<f32>(json!(10.5)).unwrap(), 10.5);
    }

    #[test]
    fn integers_reject_fractions_and_overflow() {
        assert_eq!(decode::<i32>(json!(42)).unwrap(), 42);
        assert!(decode::<i32>(json!(42.5)).is_err());
        assert!(decode::<u8>(json!(256)).is_err());
        assert!(decode::<u32>(json!(-1)).is_err());

        let err = decode::<i32>(json!("42")).unwrap_err();
        assert_eq!(err.to_string(), "expected i32, found string");
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(decode::<Option<String>>(json!(null)).unwrap(), None);
        assert_eq!(
            decode::<Option<String>>(json!("tag")).unwrap(),
            Some("tag".to_owned())
        );
        assert_eq!(None::<String>.to_value(), Value::Null);
    }

    #[test]
    fn vec_error_names_the_failing_index() {
        let err = decode::<Vec<f64>>(json!([1, 2, "three"])).unwrap_err();
        assert_eq!(err.to_string(), "[2]: expected f64, found string");
    }

    #[test]
    fn fixed_array_checks_length() {
        assert_eq!(decode::<[f32; 3]>(json!([1, 2, 3])).unwrap(), [1.0, 2.0, 3.0]);
        let err = decode::<[f32; 3]>(json!([1, 2])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected array of length 3, found shorter array"
        );
    }

    #[test]
    fn map_error_names_the_failing_key() {
        let err = decode::<BTreeMap<String, u32>>(json!({"a": 1, "b": true})).unwrap_err();
        assert_eq!(err.to_string(), "b: expected u32, found boolean");
    }

    #[test]
    fn hash_map_decodes_and_encodes() {
        let map = decode::<HashMap<String, i64>>(json!({"gold": 7, "debt": -2})).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["gold"], 7);
        assert_eq!(map["debt"], -2);
        assert_eq!(map.to_value(), json!({"debt": -2, "gold": 7}));

        let err = decode::<HashMap<String, i64>>(json!({"gold": "lots"})).unwrap_err();
        assert_eq!(err.to_string(), "gold: expected i64, found string");

        let err = decode::<HashMap<String, i64>>(json!([1])).unwrap_err();
        assert!(matches!(err, BindError::TypeMismatch { .. }));
    }

    #[test]
    fn leaves_are_not_nested() {
        assert!(!<f64 as FieldValue>::NESTED);
        assert!(!<Vec<String> as FieldValue>::NESTED);
    }

    #[test]
    fn descend_enforces_limit() {
        let ctx = DecodeContext::new(Some(1));
        let inner = ctx.descend().unwrap();
        assert_eq!(inner.depth(), 1);
        assert!(matches!(
            inner.descend(),
            Err(BindError::DepthExceeded { limit: 1, .. })
        ));
    }
}
