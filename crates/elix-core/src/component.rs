//! Component types, their descriptors, and the per-call component set.
//!
//! A component is a struct implementing [`Component`]: it has a public name
//! and a static [`ComponentDescriptor`] listing its bound fields. The
//! [`component!`](crate::component!) macro writes both impls for a struct
//! (and marks it usable as a nested field type). A [`ComponentSet`] is the
//! ordered list of component types a decode or encode call recognizes.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::entity::{AnyComponent, Entity};
use crate::field::FieldDescriptor;
use crate::value::{DecodeContext, FieldValue, Value};
use crate::{BindError, FieldPath};

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A record type that can occupy an entity slot.
///
/// Decoding starts from `Default::default()` and assigns every declared field,
/// so fields that are not declared keep their default value.
pub trait Component: Default + Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Public name, used as the component's key in entity bodies.
    const NAME: &'static str;

    /// The descriptor for this type. Built once and shared.
    fn descriptor() -> &'static ComponentDescriptor<Self>;
}

// ---------------------------------------------------------------------------
// ComponentDescriptor
// ---------------------------------------------------------------------------

/// Public name plus ordered field bindings of one component type.
pub struct ComponentDescriptor<C> {
    name: &'static str,
    fields: Vec<FieldDescriptor<C>>,
}

impl<C: Component> ComponentDescriptor<C> {
    /// An empty descriptor named `name`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Add a field binding.
    ///
    /// # Panics
    ///
    /// Panics if a field with the same name was already added.
    pub fn field<T>(mut self, name: &'static str, get: fn(&C) -> &T, set: fn(&mut C, T)) -> Self
    where
        T: FieldValue + 'static,
    {
        if self.fields.iter().any(|f| f.name() == name) {
            panic!(
                "field '{}' is declared twice in component '{}'",
                name, self.name
            );
        }
        self.fields.push(FieldDescriptor::new(name, get, set));
        self
    }

    /// Decode a component fragment with no depth limit.
    pub fn decode(&self, fragment: &Value) -> Result<C, BindError> {
        self.decode_with(fragment, DecodeContext::unbounded())
    }

    /// Decode a component fragment.
    ///
    /// Every declared key is checked before any field is assigned, and the
    /// instance is only returned once all fields decoded.
    pub fn decode_with(&self, fragment: &Value, ctx: DecodeContext) -> Result<C, BindError> {
        let ctx = ctx.descend()?;
        let object = fragment
            .as_object()
            .ok_or_else(|| BindError::type_mismatch("object", fragment))?;

        let mut present = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match object.get(field.name()) {
                Some(value) => present.push(value),
                None => {
                    return Err(BindError::MissingField {
                        path: FieldPath::new(),
                        component: self.name.to_owned(),
                        field: field.name().to_owned(),
                    })
                }
            }
        }

        let mut instance = C::default();
        for (field, value) in self.fields.iter().zip(present) {
            field
                .decode_into(&mut instance, value, ctx)
                .map_err(|e| e.at(field.name()))?;
        }
        Ok(instance)
    }

    /// Render an instance as an object with one entry per declared field.
    pub fn encode(&self, instance: &C) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|field| (field.name().to_owned(), field.encode_from(instance)))
                .collect(),
        )
    }
}

impl<C> ComponentDescriptor<C> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Field bindings in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor<C>] {
        &self.fields
    }
}

impl<C> fmt::Debug for ComponentDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Declare a struct as a [`Component`].
///
/// Each listed field is bound under its Rust name, or under the string given
/// after `as`. The struct must implement `Default`, `Clone`, `PartialEq` and
/// `Debug`. The macro also implements [`FieldValue`] for the struct so it can
/// be used as the type of another component's field.
///
/// ```
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Transform { position: [f32; 3], tag: String }
///
/// elix_core::component! {
///     Transform => "transform" { position: [f32; 3], tag: String as "label" }
/// }
///
/// use elix_core::component::Component;
/// let names: Vec<_> = Transform::descriptor().fields().iter().map(|f| f.name()).collect();
/// assert_eq!(names, ["position", "label"]);
/// ```
#[macro_export]
macro_rules! component {
    (@key $field:ident) => {
        stringify!($field)
    };
    (@key $field:ident $key:literal) => {
        $key
    };
    ($ty:ty => $name:literal { $( $field:ident : $fty:ty $(as $key:literal)? ),* $(,)? }) => {
        impl $crate::component::Component for $ty {
            const NAME: &'static str = $name;

            fn descriptor() -> &'static $crate::component::ComponentDescriptor<Self> {
                static DESCRIPTOR: ::std::sync::OnceLock<
                    $crate::component::ComponentDescriptor<$ty>,
                > = ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    $crate::component::ComponentDescriptor::new($name)
                    $(
                        .field(
                            $crate::component!(@key $field $($key)?),
                            {
                                fn get(c: &$ty) -> &$fty {
                                    &c.$field
                                }
                                get
                            },
                            {
                                fn set(c: &mut $ty, v: $fty) {
                                    c.$field = v;
                                }
                                set
                            },
                        )
                    )*
                })
            }
        }

        impl $crate::value::FieldValue for $ty {
            const NESTED: bool = true;

            fn from_value(
                value: &$crate::value::Value,
                ctx: $crate::value::DecodeContext,
            ) -> ::std::result::Result<Self, $crate::BindError> {
                <$ty as $crate::component::Component>::descriptor().decode_with(value, ctx)
            }

            fn to_value(&self) -> $crate::value::Value {
                <$ty as $crate::component::Component>::descriptor().encode(self)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Type-erased descriptor
// ---------------------------------------------------------------------------

/// Object-safe view of a component type's descriptor, so that a set of
/// heterogeneous component types can be iterated at runtime.
pub(crate) trait ErasedDescriptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(
        &self,
        fragment: &Value,
        ctx: DecodeContext,
    ) -> Result<Box<dyn AnyComponent>, BindError>;

    /// `None` if `value` is not an instance of this descriptor's type.
    fn encode(&self, value: &dyn AnyComponent) -> Option<Value>;
}

struct Binding<C>(PhantomData<fn() -> C>);

impl<C: Component> ErasedDescriptor for Binding<C> {
    fn name(&self) -> &'static str {
        C::NAME
    }

    fn decode(
        &self,
        fragment: &Value,
        ctx: DecodeContext,
    ) -> Result<Box<dyn AnyComponent>, BindError> {
        let instance = C::descriptor().decode_with(fragment, ctx)?;
        Ok(Box::new(instance))
    }

    fn encode(&self, value: &dyn AnyComponent) -> Option<Value> {
        let any: &dyn Any = value.as_any();
        any.downcast_ref::<C>()
            .map(|instance| C::descriptor().encode(instance))
    }
}

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// One registered component type: its slot identity and descriptor.
#[derive(Clone)]
pub(crate) struct SlotInfo {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) descriptor: Arc<dyn ErasedDescriptor>,
}

/// Ordered list of the component types a decode or encode call recognizes.
///
/// Registration order is slot order. The set is cheap to clone; entities
/// created from it keep the layout they were created with even if more
/// components are registered afterwards.
#[derive(Clone, Default)]
pub struct ComponentSet {
    slots: Arc<Vec<SlotInfo>>,
}

impl ComponentSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a tuple of component types, in tuple order.
    ///
    /// ```
    /// # #[derive(Debug, Clone, Default, PartialEq)] struct Position { x: f64, y: f64 }
    /// # elix_core::component! { Position => "position" { x: f64, y: f64 } }
    /// use elix_core::component::ComponentSet;
    ///
    /// let set = ComponentSet::of::<(Position,)>().unwrap();
    /// assert_eq!(set.names().collect::<Vec<_>>(), ["position"]);
    /// ```
    pub fn of<L: ComponentList>() -> Result<Self, BindError> {
        let mut set = Self::new();
        L::register_all(&mut set)?;
        Ok(set)
    }

    /// Register component type `C` and return its slot index.
    ///
    /// Registering the same type twice returns the existing slot. A different
    /// type with an already registered public name is rejected.
    pub fn register<C: Component>(&mut self) -> Result<usize, BindError> {
        let type_id = TypeId::of::<C>();
        if let Some(index) = self.index_of_type(type_id) {
            return Ok(index);
        }
        if self.contains_name(C::NAME) {
            return Err(BindError::DuplicateComponent {
                name: C::NAME.to_owned(),
            });
        }

        let slots = Arc::make_mut(&mut self.slots);
        slots.push(SlotInfo {
            type_id,
            name: C::NAME,
            descriptor: Arc::new(Binding::<C>(PhantomData)),
        });
        tracing::trace!(component = C::NAME, slot = slots.len() - 1, "registered component");
        Ok(slots.len() - 1)
    }

    /// Slot index of component type `C`, if registered.
    pub fn index_of<C: Component>(&self) -> Option<usize> {
        self.index_of_type(TypeId::of::<C>())
    }

    /// Whether a component with public name `name` is registered.
    pub fn contains_name(&self, name: &str) -> bool {
        self.slots.iter().any(|slot| slot.name == name)
    }

    /// Public names in slot order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|slot| slot.name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// A new entity with one empty slot per registered component.
    pub fn entity(&self, name: impl Into<String>) -> Entity {
        Entity::new(name, self)
    }

    pub(crate) fn slots(&self) -> &Arc<Vec<SlotInfo>> {
        &self.slots
    }

    fn index_of_type(&self, type_id: TypeId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.type_id == type_id)
    }
}

impl fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ---------------------------------------------------------------------------
// ComponentList
// ---------------------------------------------------------------------------

/// A compile-time list of component types, implemented for tuples.
pub trait ComponentList {
    /// Register every type of the list into `set`, in order.
    fn register_all(set: &mut ComponentSet) -> Result<(), BindError>;
}

macro_rules! impl_component_list {
    ($($c:ident),+) => {
        impl<$($c: Component),+> ComponentList for ($($c,)+) {
            fn register_all(set: &mut ComponentSet) -> Result<(), BindError> {
                $( set.register::<$c>()?; )+
                Ok(())
            }
        }
    };
}

impl_component_list!(A);
impl_component_list!(A, B);
impl_component_list!(A, B, C);
impl_component_list!(A, B, C, D);
impl_component_list!(A, B, C, D, E);
impl_component_list!(A, B, C, D, E, F);
impl_component_list!(A, B, C, D, E, F, G);
impl_component_list!(A, B, C, D, E, F, G, H);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
