//! Behaviour attached to entities.
//!
//! An entity holds at most one component per concrete type. Lifecycle hooks
//! are dispatched depth-first with children before their parent, so a
//! parent's `update` always sees its children's state for the current frame.

use std::any::{type_name, Any, TypeId};
use std::fmt;

use anyhow::Result;

use crate::entity::Entity;
use crate::math::Vector;
use crate::scene::Scene;

/// Type-erasure helpers every component gets for free.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn component_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// What a lifecycle hook can reach: the scene, the entity the component is
/// attached to, and the frame time step.
///
/// The running component itself is detached from `entity` for the duration
/// of the call; its siblings are not.
pub struct ComponentContext<'a> {
    pub scene: &'a mut Scene,
    pub entity: &'a mut Entity,
    /// Seconds since the previous frame. Zero during `start`.
    pub delta_time: f32,
}

/// Behaviour attached to an [`Entity`].
///
/// While a hook runs, its own component is detached from the entity:
/// `ctx.entity.get_component::<Self>()` returns `None` inside `start` and
/// `update`, so use `self` instead. Other components on the entity are
/// reachable as usual.
pub trait Component: AsAny {
    /// Called once before the first frame.
    fn start(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called once per frame.
    fn update(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Start,
    Update,
}

impl Lifecycle {
    pub(crate) fn invoke(
        self,
        component: &mut dyn Component,
        ctx: &mut ComponentContext<'_>,
    ) -> Result<()> {
        match self {
            Lifecycle::Start => component.start(ctx),
            Lifecycle::Update => component.update(ctx),
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Start => f.write_str("start"),
            Lifecycle::Update => f.write_str("update"),
        }
    }
}

struct Slot {
    type_id: TypeId,
    name: &'static str,
    // Empty while the component is running.
    component: Option<Box<dyn Component>>,
}

/// One component per concrete type, kept in insertion order.
#[derive(Default)]
pub struct ComponentRegistry {
    slots: Vec<Slot>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `component`, dropping any previous component of the same type.
    pub fn insert<C: Component>(&mut self, component: C) {
        self.insert_boxed(Box::new(component));
    }

    pub fn insert_boxed(&mut self, component: Box<dyn Component>) {
        let type_id = component.as_ref().as_any().type_id();
        let name = component.as_ref().component_name();
        match self.slots.iter_mut().find(|slot| slot.type_id == type_id) {
            Some(slot) => slot.component = Some(component),
            None => self.slots.push(Slot {
                type_id,
                name,
                component: Some(component),
            }),
        }
    }

    pub fn get<C: Component>(&self) -> Option<&C> {
        self.slot(TypeId::of::<C>())?
            .component
            .as_deref()?
            .as_any()
            .downcast_ref()
    }

    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.slots
            .iter_mut()
            .find(|slot| slot.type_id == TypeId::of::<C>())?
            .component
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut()
    }

    pub fn contains<C: Component>(&self) -> bool {
        self.get::<C>().is_some()
    }

    pub fn remove<C: Component>(&mut self) -> Option<C> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.type_id == TypeId::of::<C>())?;
        let component = self.slots.remove(index).component?;
        component.into_any().downcast().ok().map(|boxed: Box<C>| *boxed)
    }

    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.component.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type names of the stored components, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.component.is_some())
            .map(|slot| slot.name)
    }

    pub(crate) fn type_ids(&self) -> Vec<TypeId> {
        self.slots.iter().map(|slot| slot.type_id).collect()
    }

    pub(crate) fn take(&mut self, type_id: TypeId) -> Option<Box<dyn Component>> {
        self.slots
            .iter_mut()
            .find(|slot| slot.type_id == type_id)?
            .component
            .take()
    }

    /// Puts a component taken with [`take`](Self::take) back. A component of
    /// the same type inserted in the meantime wins, and a slot removed in the
    /// meantime stays removed.
    pub(crate) fn restore(&mut self, type_id: TypeId, component: Box<dyn Component>) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.type_id == type_id) {
            if slot.component.is_none() {
                slot.component = Some(component);
            }
        }
    }

    fn slot(&self, type_id: TypeId) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.type_id == type_id)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Rotates its entity at a constant rate, in radians per second per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub rate: Vector,
}

impl Spin {
    pub fn new(rate: Vector) -> Self {
        Self { rate }
    }
}

impl Component for Spin {
    fn update(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
        ctx.entity.rotate(self.rate * ctx.delta_time);
        Ok(())
    }
}
