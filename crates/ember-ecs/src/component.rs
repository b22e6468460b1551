use std::any::{Any, TypeId};
use std::collections::HashMap;

use ember_core::EntityId;

use crate::error::EcsError;

/// Marker trait for types that can be stored as ECS components.
pub trait Component: 'static {}

/// Blanket implementation: any `'static` type is a valid component.
impl<T: 'static> Component for T {}

/// Type-erased component storage interface, one per component type.
pub(crate) trait ComponentStore: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, entity: EntityId) -> bool;
    fn has(&self, entity: EntityId) -> bool;
    fn len(&self) -> usize;
}

/// Dense storage for a single component type: packed values plus an id
/// index for O(1) amortized lookup. Removal swap-compacts so iteration
/// never visits stale entries.
pub(crate) struct DenseMap<T> {
    index: HashMap<EntityId, usize>,
    dense: Vec<T>,
    entities: Vec<EntityId>,
}

impl<T: Component> DenseMap<T> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            dense: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Insert a component for an entity that does not yet have one.
    /// Returns `false` (leaving the existing value untouched) on duplicates.
    pub fn insert(&mut self, entity: EntityId, value: T) -> bool {
        if self.index.contains_key(&entity) {
            return false;
        }
        self.index.insert(entity, self.dense.len());
        self.dense.push(value);
        self.entities.push(entity);
        true
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.index.get(&entity).map(|&i| &self.dense[i])
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.index.get(&entity).map(|&i| &mut self.dense[i])
    }

    /// Iterate all `(entity, &component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }
}

impl<T: Component> ComponentStore for DenseMap<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove(&mut self, entity: EntityId) -> bool {
        let Some(dense_idx) = self.index.remove(&entity) else {
            return false;
        };
        let last = self.dense.len() - 1;
        if dense_idx != last {
            // Swap-remove: the last element moves into the freed slot.
            self.dense.swap(dense_idx, last);
            self.entities.swap(dense_idx, last);
            let moved = self.entities[dense_idx];
            self.index.insert(moved, dense_idx);
        }
        self.dense.pop();
        self.entities.pop();
        true
    }

    fn has(&self, entity: EntityId) -> bool {
        self.index.contains_key(&entity)
    }

    fn len(&self) -> usize {
        self.dense.len()
    }
}

/// Per-world, per-type component storage keyed by entity id.
///
/// At most one component of a given type may be attached to an entity.
pub struct ComponentManager {
    stores: HashMap<TypeId, Box<dyn ComponentStore>>,
}

impl ComponentManager {
    pub fn new() -> Self {
        Self {
            stores: HashMap::new(),
        }
    }

    fn store<T: Component>(&self) -> Option<&DenseMap<T>> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<DenseMap<T>>())
    }

    fn store_mut<T: Component>(&mut self) -> &mut DenseMap<T> {
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(DenseMap::<T>::new()))
            .as_any_mut()
            .downcast_mut::<DenseMap<T>>()
            .expect("component store type mismatch")
    }

    /// Attach a default-initialized component of type `T` to an entity.
    ///
    /// Fails with [`EcsError::DuplicateComponent`] if the entity already
    /// has one; the existing component is left untouched.
    pub fn add<T: Component + Default>(&mut self, entity: EntityId) -> Result<&mut T, EcsError> {
        self.insert(entity, T::default())
    }

    /// Attach a component with an explicit value (scene deserialization).
    /// Same exclusivity rules as [`ComponentManager::add`].
    pub fn insert<T: Component>(&mut self, entity: EntityId, value: T) -> Result<&mut T, EcsError> {
        let store = self.store_mut::<T>();
        if !store.insert(entity, value) {
            return Err(EcsError::DuplicateComponent(
                entity,
                std::any::type_name::<T>(),
            ));
        }
        // Just inserted above, so the lookup cannot miss.
        Ok(store
            .get_mut(entity)
            .expect("freshly inserted component missing"))
    }

    /// Get an immutable reference to a component. Never allocates.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.store::<T>()?.get(entity)
    }

    /// Get a mutable reference to a component. Never allocates.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<DenseMap<T>>())
            .and_then(|s| s.get_mut(entity))
    }

    /// Whether the entity has a component of type `T`.
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.store::<T>().is_some_and(|s| s.has(entity))
    }

    /// Detach and destroy a component. No-op (returning `false`) if absent.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> bool {
        match self.stores.get_mut(&TypeId::of::<T>()) {
            Some(store) => store.remove(entity),
            None => false,
        }
    }

    /// Remove every component attached to an entity. Invoked exactly once
    /// from `EntityManager::destroy`, so no component outlives its entity.
    ///
    /// The transform hierarchy is detached first: children are reparented
    /// to `EntityId::INVALID` and the entity leaves its parent's child list.
    pub fn clear(&mut self, entity: EntityId) {
        self.detach_hierarchy(entity);
        for store in self.stores.values_mut() {
            store.remove(entity);
        }
    }

    /// Enumerate all live components of type `T` with their owning entities.
    pub fn components<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.store::<T>().into_iter().flat_map(|s| s.iter())
    }

    /// Enumerate all live components of type `T` mutably.
    pub fn components_mut<T: Component>(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<DenseMap<T>>())
            .into_iter()
            .flat_map(|s| s.iter_mut())
    }

    /// Number of live components of type `T`.
    pub fn count<T: Component>(&self) -> usize {
        self.store::<T>().map_or(0, |s| s.len())
    }

    /// Total number of live components across all types.
    pub fn total_count(&self) -> usize {
        self.stores.values().map(|s| s.len()).sum()
    }
}

impl Default for ComponentManager {
    fn default() -> Self {
        Self::new()
    }
}
