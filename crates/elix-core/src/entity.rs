//! Named entities holding at most one instance of each known component.
//!
//! An [`Entity`] has one slot per component type of the [`ComponentSet`] it
//! was created from. Slots are stored type-erased and accessed through typed
//! getters, mirroring how the set's descriptors are iterated at runtime.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::component::{Component, ComponentSet, SlotInfo};
use crate::BindError;

/// The ordered result of one decode call, or the input of one encode call.
pub type EntityCollection = Vec<Entity>;

// ---------------------------------------------------------------------------
// AnyComponent
// ---------------------------------------------------------------------------

/// Object-safe view of a component instance stored in a slot.
pub(crate) trait AnyComponent: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_box(&self) -> Box<dyn AnyComponent>;
    fn eq_dyn(&self, other: &dyn AnyComponent) -> bool;
    fn debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<C: Component> AnyComponent for C {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_box(&self) -> Box<dyn AnyComponent> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn AnyComponent) -> bool {
        other.as_any().downcast_ref::<C>() == Some(self)
    }

    fn debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Debug for dyn AnyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug(f)
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A named container with one optional slot per known component type.
///
/// The entity owns the instances in its slots.
pub struct Entity {
    name: String,
    layout: Arc<Vec<SlotInfo>>,
    slots: Vec<Option<Box<dyn AnyComponent>>>,
}

impl Entity {
    /// An entity named `name` with every slot of `components` empty.
    pub fn new(name: impl Into<String>, components: &ComponentSet) -> Self {
        let layout = Arc::clone(components.slots());
        let slots = layout.iter().map(|_| None).collect();
        Self {
            name: name.into(),
            layout,
            slots,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The component of type `C`, if its slot is populated.
    pub fn get<C: Component>(&self) -> Option<&C> {
        let index = self.slot_of::<C>()?;
        self.slots[index]
            .as_deref()
            .and_then(|value| value.as_any().downcast_ref::<C>())
    }

    /// Mutable access to the component of type `C`, if its slot is populated.
    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        let index = self.slot_of::<C>()?;
        self.slots[index]
            .as_deref_mut()
            .and_then(|value| value.as_any_mut().downcast_mut::<C>())
    }

    /// Whether the slot for `C` is populated.
    pub fn has<C: Component>(&self) -> bool {
        self.get::<C>().is_some()
    }

    /// Put `component` into its slot, returning the previous occupant.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::UnregisteredComponent`] if `C` is not part of the
    /// component set this entity was created from.
    pub fn insert<C: Component>(&mut self, component: C) -> Result<Option<C>, BindError> {
        let index = self
            .slot_of::<C>()
            .ok_or_else(|| BindError::UnregisteredComponent {
                name: C::NAME.to_owned(),
            })?;
        let previous = self.slots[index].replace(Box::new(component));
        Ok(previous.and_then(downcast_owned::<C>))
    }

    /// Builder form of [`Entity::insert`].
    pub fn with<C: Component>(mut self, component: C) -> Result<Self, BindError> {
        self.insert(component)?;
        Ok(self)
    }

    /// Empty the slot for `C`, returning its occupant.
    pub fn remove<C: Component>(&mut self) -> Option<C> {
        let index = self.slot_of::<C>()?;
        self.slots[index].take().and_then(downcast_owned::<C>)
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Public names of the populated slots, in slot order.
    pub fn component_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.populated().map(|(info, _)| info.name)
    }

    /// Populated slots with their registration info, in slot order.
    pub(crate) fn populated(&self) -> impl Iterator<Item = (&SlotInfo, &dyn AnyComponent)> + '_ {
        self.layout
            .iter()
            .zip(&self.slots)
            .filter_map(|(info, slot)| slot.as_deref().map(|value| (info, value)))
    }

    /// The populated slot holding the component with Rust type `type_id`.
    pub(crate) fn slot_by_type(&self, type_id: TypeId) -> Option<&dyn AnyComponent> {
        self.populated()
            .find(|(info, _)| info.type_id == type_id)
            .map(|(_, value)| value)
    }

    pub(crate) fn set_slot(&mut self, index: usize, value: Box<dyn AnyComponent>) {
        self.slots[index] = Some(value);
    }

    fn slot_of<C: Component>(&self) -> Option<usize> {
        let type_id = TypeId::of::<C>();
        self.layout.iter().position(|info| info.type_id == type_id)
    }
}

fn downcast_owned<C: Component>(value: Box<dyn AnyComponent>) -> Option<C> {
    value.into_any().downcast::<C>().ok().map(|boxed| *boxed)
}

impl Clone for Entity {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            layout: Arc::clone(&self.layout),
            slots: self
                .slots
                .iter()
                .map(|slot| slot.as_ref().map(|value| value.clone_box()))
                .collect(),
        }
    }
}

/// Two entities are equal when their names match and they hold equal
/// components of the same types, in the same slot order.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name || self.len() != other.len() {
            return false;
        }
        self.populated()
            .zip(other.populated())
            .all(|((a_info, a), (b_info, b))| a_info.type_id == b_info.type_id && a.eq_dyn(b))
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Slots<'a>(&'a Entity);

        impl fmt::Debug for Slots<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map()
                    .entries(self.0.populated().map(|(info, value)| (info.name, value)))
                    .finish()
            }
        }

        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("components", &Slots(self))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Position {
        x: f64,
        y: f64,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Health {
        points: u32,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Orphan {
        id: u32,
    }

    crate::component! { Position => "position" { x: f64, y: f64 } }
    crate::component! { Health => "health" { points: u32 } }
    crate::component! { Orphan => "orphan" { id: u32 } }

    fn setup_set() -> ComponentSet {
        ComponentSet::of::<(Position, Health)>().unwrap()
    }

    #[test]
    fn new_entity_has_empty_slots() {
        let entity = setup_set().entity("Wizard1");
        assert_eq!(entity.name(), "Wizard1");
        assert!(entity.is_empty());
        assert_eq!(entity.get::<Position>(), None);
    }

    #[test]
    fn insert_get_remove() {
        let mut entity = setup_set().entity("Wizard1");
        let previous = entity.insert(Position { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(previous, None);
        assert_eq!(entity.get::<Position>(), Some(&Position { x: 1.0, y: 2.0 }));
        assert!(!entity.has::<Health>());

        let previous = entity.insert(Position { x: 3.0, y: 4.0 }).unwrap();
        assert_eq!(previous, Some(Position { x: 1.0, y: 2.0 }));

        if let Some(pos) = entity.get_mut::<Position>() {
            pos.x = 42.0;
        }
        assert_eq!(entity.remove::<Position>(), Some(Position { x: 42.0, y: 4.0 }));
        assert!(entity.is_empty());
    }

    #[test]
    fn insert_unregistered_type_fails() {
        let mut entity = setup_set().entity("Wizard1");
        let err = entity.insert(Orphan { id: 7 }).unwrap_err();
        assert!(matches!(err, BindError::UnregisteredComponent { ref name } if name == "orphan"));
        assert_eq!(entity.get::<Orphan>(), None);
    }

    #[test]
    fn component_names_follow_slot_order() {
        let entity = setup_set()
            .entity("Wizard1")
            .with(Health { points: 10 })
            .unwrap()
            .with(Position { x: 0.0, y: 0.0 })
            .unwrap();
        assert_eq!(entity.component_names().collect::<Vec<_>>(), ["position", "health"]);
        assert_eq!(entity.len(), 2);
    }

    #[test]
    fn clone_and_equality_compare_slot_contents() {
        let set = setup_set();
        let a = set.entity("Wizard1").with(Health { points: 10 }).unwrap();
        let b = a.clone();
        assert_eq!(a, b);

        let c = set.entity("Wizard1").with(Health { points: 11 }).unwrap();
        assert_ne!(a, c);

        let d = set.entity("Wizard2").with(Health { points: 10 }).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn entity_keeps_layout_after_set_grows() {
        let mut set = setup_set();
        let mut entity = set.entity("Wizard1");
        set.register::<Orphan>().unwrap();
        assert!(entity.insert(Orphan { id: 1 }).is_err());
        assert!(set.entity("Wizard2").insert(Orphan { id: 1 }).is_ok());
    }

    #[test]
    fn debug_lists_populated_components() {
        let entity = setup_set().entity("W").with(Health { points: 3 }).unwrap();
        assert_eq!(
            format!("{entity:?}"),
            "Entity { name: \"W\", components: {\"health\": Health { points: 3 }} }"
        );
    }
}
