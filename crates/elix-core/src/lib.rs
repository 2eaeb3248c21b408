//! Elix Core -- descriptor-driven binding between typed components and JSON.
//!
//! Components are plain Rust structs that declare, through a
//! [`ComponentDescriptor`](component::ComponentDescriptor), which of their
//! fields appear in a document and under which names. A [`Codec`](codec::Codec)
//! walks a document of named entities and fills one slot per known component
//! type, or renders a collection of entities back into a document.
//!
//! # Quick Start
//!
//! ```
//! use elix_core::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Position { x: f64, y: f64 }
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Spell { name: String, damage: i32, position: Position }
//!
//! elix_core::component! { Position => "position" { x: f64, y: f64 } }
//! elix_core::component! {
//!     Spell => "spell" { name: String, damage: i32, position: Position }
//! }
//!
//! let components = ComponentSet::of::<(Position, Spell)>().unwrap();
//! let codec = Codec::new(components, CodecConfig::default()).unwrap();
//!
//! let entities = codec
//!     .decode_str(r#"{"Wizard1": {"position": {"x": 10.5, "y": 19.3}}}"#)
//!     .unwrap();
//!
//! assert_eq!(entities[0].name(), "Wizard1");
//! assert_eq!(entities[0].get::<Position>(), Some(&Position { x: 10.5, y: 19.3 }));
//! assert!(entities[0].get::<Spell>().is_none());
//! ```

#![deny(unsafe_code)]

pub mod codec;
pub mod component;
pub mod entity;
pub mod field;
pub mod value;

use std::fmt;

// ---------------------------------------------------------------------------
// FieldPath
// ---------------------------------------------------------------------------

/// Location of a failure inside a document, outermost segment first.
///
/// Segments are entity names, component names, field names and `[index]`
/// markers for sequence elements. Rendered as `a: b: c: ` so that it can be
/// used directly as a message prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// The empty path (document root).
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The outermost segment, if any.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefix `segment` to the path.
    pub fn push_front(&mut self, segment: impl Into<String>) {
        self.0.insert(0, segment.into());
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "{segment}: ")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while binding documents to components.
///
/// Every decode failure is terminal for the call that raised it; no partially
/// decoded entity is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// The input text is not well-formed JSON.
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A document node exists but has the wrong shape or type.
    #[error("{path}expected {expected}, found {actual}")]
    TypeMismatch {
        path: FieldPath,
        expected: String,
        actual: &'static str,
    },

    /// A declared field is absent from its component fragment.
    #[error("{path}field `{field}` is undefined in component `{component}`")]
    MissingField {
        path: FieldPath,
        component: String,
        field: String,
    },

    /// A body key matches no known component (only under the reject policy).
    #[error("{path}unknown component `{component}`")]
    UnknownComponent { path: FieldPath, component: String },

    /// Nested component decoding went deeper than the configured limit.
    #[error("{path}nested component depth exceeds limit of {limit}")]
    DepthExceeded { path: FieldPath, limit: usize },

    /// Two distinct component types were registered under one public name.
    #[error("component name '{name}' is already registered for a different type")]
    DuplicateComponent { name: String },

    /// The sequence-shape name key equals a registered component name.
    #[error("name key '{name}' collides with a registered component name")]
    NameKeyCollision { name: String },

    /// A component type was used with an entity whose set does not contain it.
    #[error("component type '{name}' is not part of this entity's component set")]
    UnregisteredComponent { name: String },
}

impl BindError {
    /// Build a [`BindError::TypeMismatch`] at the empty path.
    pub fn type_mismatch(expected: impl Into<String>, found: &serde_json::Value) -> Self {
        BindError::TypeMismatch {
            path: FieldPath::new(),
            expected: expected.into(),
            actual: value::kind_of(found),
        }
    }

    /// Prefix `segment` to the error's path. Errors without a path are
    /// returned unchanged.
    pub fn at(mut self, segment: impl Into<String>) -> Self {
        if let Some(path) = self.path_mut() {
            path.push_front(segment);
        }
        self
    }

    /// Where in the document the error occurred, if it is document-related.
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            BindError::TypeMismatch { path, .. }
            | BindError::MissingField { path, .. }
            | BindError::UnknownComponent { path, .. }
            | BindError::DepthExceeded { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The name of the entity that failed to decode (first path segment).
    pub fn entity(&self) -> Option<&str> {
        self.path().and_then(FieldPath::first)
    }

    fn path_mut(&mut self) -> Option<&mut FieldPath> {
        match self {
            BindError::TypeMismatch { path, .. }
            | BindError::MissingField { path, .. }
            | BindError::UnknownComponent { path, .. }
            | BindError::DepthExceeded { path, .. } => Some(path),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::codec::{
        decode_all, encode_all, Codec, CodecConfig, DocumentShape, UnknownComponentPolicy,
    };
    pub use crate::component::{Component, ComponentDescriptor, ComponentList, ComponentSet};
    pub use crate::entity::{Entity, EntityCollection};
    pub use crate::field::FieldDescriptor;
    pub use crate::value::{DecodeContext, FieldValue, Value};
    pub use crate::{BindError, FieldPath};
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
