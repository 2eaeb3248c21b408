//! Whole-document decode and encode.
//!
//! The [`Codec`] walks every entity body of a document and, for each known
//! component in registration order, decodes the fragment found under the
//! component's public name into the entity's slot. Absent components leave
//! the slot empty. Encoding is the mirror operation and omits empty slots.
//!
//! # Document shapes
//!
//! Exactly one shape is expected per codec, chosen by
//! [`CodecConfig::shape`]:
//!
//! - [`DocumentShape::Map`]: `{"<entity>": {"<component>": {...}}}`
//! - [`DocumentShape::Sequence`]: `[{"__name": "<entity>", "<component>": {...}}]`
//!
//! # Failure paths
//!
//! Errors carry the path to the failing node, outermost first, e.g.
//! `Wizard3: position: field `y` is undefined in component `position``.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::component::ComponentSet;
use crate::entity::{Entity, EntityCollection};
use crate::value::{self, DecodeContext, Value};
use crate::{BindError, FieldPath};

/// Key carrying the entity name in sequence-shaped documents.
pub const DEFAULT_NAME_KEY: &str = "__name";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Root layout of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentShape {
    /// Object keyed by entity name.
    #[default]
    Map,
    /// Array of entity bodies, each naming itself under `name_key`.
    Sequence { name_key: String },
}

impl DocumentShape {
    /// Sequence shape with the default `"__name"` key.
    pub fn sequence() -> Self {
        DocumentShape::Sequence {
            name_key: DEFAULT_NAME_KEY.to_owned(),
        }
    }
}

/// What to do with entity body keys that match no known component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownComponentPolicy {
    /// Skip the key (logged at `warn`).
    #[default]
    Ignore,
    /// Fail with [`BindError::UnknownComponent`].
    Reject,
}

/// Configuration for a [`Codec`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Expected root layout. Never autodetected.
    pub shape: DocumentShape,
    /// Handling of unrecognized component keys.
    pub unknown_components: UnknownComponentPolicy,
    /// Maximum component nesting depth; a top-level component is depth 1.
    /// `None` disables the limit.
    pub max_depth: Option<usize>,
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Converts between documents and entity collections for one component set.
///
/// A codec holds no mutable state; every call is an independent pass.
#[derive(Debug, Clone)]
pub struct Codec {
    components: ComponentSet,
    config: CodecConfig,
}

impl Codec {
    /// # Errors
    ///
    /// [`BindError::NameKeyCollision`] if a sequence shape's name key is also
    /// the public name of a component in `components`.
    pub fn new(components: ComponentSet, config: CodecConfig) -> Result<Self, BindError> {
        if let DocumentShape::Sequence { name_key } = &config.shape {
            if components.contains_name(name_key) {
                return Err(BindError::NameKeyCollision {
                    name: name_key.clone(),
                });
            }
        }
        Ok(Self { components, config })
    }

    fn with_defaults(components: &ComponentSet) -> Self {
        Self {
            components: components.clone(),
            config: CodecConfig::default(),
        }
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Parse `text` and decode it.
    pub fn decode_str(&self, text: &str) -> Result<EntityCollection, BindError> {
        let document = value::parse(text)?;
        self.decode(&document)
    }

    /// Decode a document into entities, in document order.
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole decode; no entities are returned.
    pub fn decode(&self, document: &Value) -> Result<EntityCollection, BindError> {
        let entities = match &self.config.shape {
            DocumentShape::Map => self.decode_map(document)?,
            DocumentShape::Sequence { name_key } => self.decode_sequence(document, name_key)?,
        };
        tracing::debug!(
            entities = entities.len(),
            components = self.components.len(),
            shape = ?self.config.shape,
            "decoded document"
        );
        Ok(entities)
    }

    /// Encode entities into a document of the configured shape.
    ///
    /// Populated slots become `{component_name: fields}` entries in
    /// registration order; empty slots are omitted.
    pub fn encode(&self, entities: &[Entity]) -> Value {
        let document = match &self.config.shape {
            DocumentShape::Map => {
                let mut root = Map::new();
                for entity in entities {
                    if root.contains_key(entity.name()) {
                        tracing::warn!(
                            entity = entity.name(),
                            "duplicate entity name -- later entity replaces earlier one"
                        );
                    }
                    let body = self.encode_body(entity);
                    root.insert(entity.name().to_owned(), Value::Object(body));
                }
                Value::Object(root)
            }
            DocumentShape::Sequence { name_key } => Value::Array(
                entities
                    .iter()
                    .map(|entity| {
                        let mut body = self.encode_body(entity);
                        body.insert(name_key.clone(), Value::String(entity.name().to_owned()));
                        Value::Object(body)
                    })
                    .collect(),
            ),
        };
        tracing::debug!(entities = entities.len(), "encoded document");
        document
    }

    /// Encode entities and render the document as text.
    pub fn encode_string(&self, entities: &[Entity], pretty: bool) -> String {
        value::serialize(&self.encode(entities), pretty)
    }

    // -- decode helpers -----------------------------------------------------

    fn decode_map(&self, document: &Value) -> Result<EntityCollection, BindError> {
        let root = document
            .as_object()
            .ok_or_else(|| BindError::type_mismatch("object of entities", document))?;

        root.iter()
            .map(|(name, body)| self.decode_entity(name, body, None))
            .collect()
    }

    fn decode_sequence(
        &self,
        document: &Value,
        name_key: &str,
    ) -> Result<EntityCollection, BindError> {
        let root = document
            .as_array()
            .ok_or_else(|| BindError::type_mismatch("array of entities", document))?;

        root.iter()
            .enumerate()
            .map(|(index, body)| {
                let at_index = |e: BindError| e.at(format!("[{index}]"));
                let object = body
                    .as_object()
                    .ok_or_else(|| at_index(BindError::type_mismatch("object", body)))?;
                let name = match object.get(name_key) {
                    Some(Value::String(name)) => name,
                    Some(other) => {
                        return Err(at_index(
                            BindError::type_mismatch("string", other).at(name_key),
                        ))
                    }
                    None => {
                        return Err(at_index(BindError::MissingField {
                            path: FieldPath::new(),
                            component: "entity".to_owned(),
                            field: name_key.to_owned(),
                        }))
                    }
                };
                self.decode_entity(name, body, Some(name_key))
            })
            .collect()
    }

    /// Decode one entity body. `reserved` is a body key that is not a
    /// component (the sequence shape's name key).
    fn decode_entity(
        &self,
        name: &str,
        body: &Value,
        reserved: Option<&str>,
    ) -> Result<Entity, BindError> {
        self.decode_body(name, body, reserved).map_err(|e| e.at(name))
    }

    fn decode_body(
        &self,
        name: &str,
        body: &Value,
        reserved: Option<&str>,
    ) -> Result<Entity, BindError> {
        let object = body
            .as_object()
            .ok_or_else(|| BindError::type_mismatch("object", body))?;

        for key in object.keys() {
            if Some(key.as_str()) == reserved || self.components.contains_name(key) {
                continue;
            }
            match self.config.unknown_components {
                UnknownComponentPolicy::Ignore => {
                    tracing::warn!(
                        entity = name,
                        component = %key,
                        "unknown component -- skipping"
                    );
                }
                UnknownComponentPolicy::Reject => {
                    return Err(BindError::UnknownComponent {
                        path: FieldPath::new(),
                        component: key.clone(),
                    });
                }
            }
        }

        let ctx = DecodeContext::new(self.config.max_depth);
        let mut entity = Entity::new(name, &self.components);
        for (index, slot) in self.components.slots().iter().enumerate() {
            let Some(fragment) = object.get(slot.name) else {
                continue;
            };
            if !fragment.is_object() {
                return Err(BindError::type_mismatch("object", fragment).at(slot.name));
            }
            let component = slot
                .descriptor
                .decode(fragment, ctx)
                .map_err(|e| e.at(slot.name))?;
            entity.set_slot(index, component);
        }

        tracing::trace!(entity = name, components = entity.len(), "decoded entity");
        Ok(entity)
    }

    // -- encode helpers -----------------------------------------------------

    fn encode_body(&self, entity: &Entity) -> Map<String, Value> {
        let mut body = Map::new();
        for slot in self.components.slots().iter() {
            let Some(component) = entity.slot_by_type(slot.type_id) else {
                continue;
            };
            if let Some(fragment) = slot.descriptor.encode(component) {
                body.insert(slot.name.to_owned(), fragment);
            }
        }
        if body.len() < entity.len() {
            tracing::debug!(
                entity = entity.name(),
                "entity holds components outside the codec's set -- omitted"
            );
        }
        body
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Decode a map-shaped document against `components` with default settings.
pub fn decode_all(
    document: &Value,
    components: &ComponentSet,
) -> Result<EntityCollection, BindError> {
    Codec::with_defaults(components).decode(document)
}

/// Encode entities into a map-shaped document with default settings.
pub fn encode_all(entities: &[Entity], components: &ComponentSet) -> Value {
    Codec::with_defaults(components).encode(entities)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
