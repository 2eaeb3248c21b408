//! Field descriptors: one named, externally visible field of a component.

use std::fmt;

use crate::value::{DecodeContext, FieldValue, Value};
use crate::BindError;

/// Type-erased function that decodes a document node and stores it in the
/// owning component through the field's setter.
type DecodeFn<C> =
    Box<dyn Fn(&mut C, &Value, DecodeContext) -> Result<(), BindError> + Send + Sync>;

/// Type-erased function that reads the field through its getter and renders
/// it as a document node.
type EncodeFn<C> = Box<dyn Fn(&C) -> Value + Send + Sync>;

/// Binds one document key to a field of component type `C`.
///
/// The accessor pair is captured once, when the component's descriptor is
/// built; the field's value type only survives as the `nested` flag.
pub struct FieldDescriptor<C> {
    name: &'static str,
    nested: bool,
    decode: DecodeFn<C>,
    encode: EncodeFn<C>,
}

impl<C: 'static> FieldDescriptor<C> {
    /// Describe a field stored as `T`, reached through `get` and `set`.
    pub fn new<T>(name: &'static str, get: fn(&C) -> &T, set: fn(&mut C, T)) -> Self
    where
        T: FieldValue + 'static,
    {
        Self {
            name,
            nested: T::NESTED,
            decode: Box::new(move |component: &mut C, value: &Value, ctx: DecodeContext| {
                set(component, T::from_value(value, ctx)?);
                Ok(())
            }),
            encode: Box::new(move |component: &C| get(component).to_value()),
        }
    }
}

impl<C> FieldDescriptor<C> {
    /// Document key of this field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the field's value is itself a component.
    pub fn is_nested_component(&self) -> bool {
        self.nested
    }

    /// Decode `value` and assign it to the field of `component`.
    ///
    /// On error the component is left as it was before the call.
    pub fn decode_into(
        &self,
        component: &mut C,
        value: &Value,
        ctx: DecodeContext,
    ) -> Result<(), BindError> {
        (self.decode)(component, value, ctx)
    }

    /// Read the field of `component` as a document node.
    pub fn encode_from(&self, component: &C) -> Value {
        (self.encode)(component)
    }
}

impl<C> fmt::Debug for FieldDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("nested", &self.nested)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Tagged {
        tag: String,
        weights: Vec<f64>,
    }

    fn get_tag(c: &Tagged) -> &String {
        &c.tag
    }

    fn set_tag(c: &mut Tagged, v: String) {
        c.tag = v;
    }

    fn get_weights(c: &Tagged) -> &Vec<f64> {
        &c.weights
    }

    fn set_weights(c: &mut Tagged, v: Vec<f64>) {
        c.weights = v;
    }

    fn tag_field() -> FieldDescriptor<Tagged> {
        FieldDescriptor::new("tag", get_tag, set_tag)
    }

    #[test]
    fn decode_sets_through_accessor() {
        let field = tag_field();
        let mut tagged = Tagged::default();
        field
            .decode_into(&mut tagged, &json!("value"), DecodeContext::unbounded())
            .unwrap();
        assert_eq!(tagged.tag, "value");
        assert!(!field.is_nested_component());
    }

    #[test]
    fn failed_coercion_leaves_field_untouched() {
        let field = FieldDescriptor::new("weights", get_weights, set_weights);
        let mut tagged = Tagged {
            tag: String::new(),
            weights: vec![1.0],
        };
        let err = field
            .decode_into(&mut tagged, &json!([2, "x"]), DecodeContext::unbounded())
            .unwrap_err();
        assert!(matches!(err, BindError::TypeMismatch { .. }));
        assert_eq!(tagged.weights, vec![1.0]);
    }

    #[test]
    fn encode_reads_through_accessor() {
        let field = tag_field();
        let tagged = Tagged {
            tag: "value".to_owned(),
            weights: Vec::new(),
        };
        assert_eq!(field.encode_from(&tagged), json!("value"));
        assert_eq!(
            format!("{field:?}"),
            "FieldDescriptor { name: \"tag\", nested: false }"
        );
    }
}
