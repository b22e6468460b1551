use std::collections::HashMap;

use ember_core::{EntityId, Uid, WorldId};
use tracing::info;

use crate::component::ComponentManager;
use crate::entity::EntityManager;
use crate::system::{SystemManager, WorldCtx};

/// One loaded scene: an entity manager, a component manager, and a system
/// manager, plus a name and a process-unique id.
pub struct World {
    id: WorldId,
    name: String,
    pub entities: EntityManager,
    pub components: ComponentManager,
    pub systems: SystemManager,
}

impl World {
    /// Create an empty world.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let id = Uid::generate();
        info!(world = %name, %id, "world created");
        Self {
            id,
            name,
            entities: EntityManager::new(),
            components: ComponentManager::new(),
            systems: SystemManager::new(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a new entity in this world.
    pub fn spawn(&mut self) -> EntityId {
        self.entities.create()
    }

    /// Destroy an entity and all of its components.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.entities.destroy(id, &mut self.components)
    }

    /// Run `update` on this world's systems.
    pub fn update(&mut self, dt: f32) {
        let mut ctx = WorldCtx {
            entities: &mut self.entities,
            components: &mut self.components,
            dt,
        };
        self.systems.update(&mut ctx);
    }

    /// Run `draw` on this world's systems.
    pub fn draw(&mut self, dt: f32) {
        let mut ctx = WorldCtx {
            entities: &mut self.entities,
            components: &mut self.components,
            dt,
        };
        self.systems.draw(&mut ctx);
    }

    /// Tear down: destroy all systems, then drop all storage.
    pub fn shutdown(&mut self) {
        info!(world = %self.name, "world shutdown");
        self.systems.clear();
        self.components = ComponentManager::new();
        self.entities = EntityManager::new();
    }
}

/// All loaded worlds, keyed by id. The engine owns exactly one registry.
pub struct WorldRegistry {
    worlds: HashMap<WorldId, World>,
}

impl WorldRegistry {
    pub fn new() -> Self {
        Self {
            worlds: HashMap::new(),
        }
    }

    /// Create and register a new world, returning its id.
    pub fn create(&mut self, name: impl Into<String>) -> WorldId {
        let world = World::new(name);
        let id = world.id();
        self.worlds.insert(id, world);
        id
    }

    /// Register an externally constructed world (scene deserialization).
    pub fn add(&mut self, world: World) -> WorldId {
        let id = world.id();
        self.worlds.insert(id, world);
        id
    }

    /// Look up a world by numeric id.
    pub fn get_world(&self, id: WorldId) -> Option<&World> {
        self.worlds.get(&id)
    }

    /// Look up a world by numeric id, mutably.
    pub fn get_world_mut(&mut self, id: WorldId) -> Option<&mut World> {
        self.worlds.get_mut(&id)
    }

    /// Shut a world down and remove it. Returns `false` if absent.
    pub fn remove(&mut self, id: WorldId) -> bool {
        match self.worlds.remove(&id) {
            Some(mut world) => {
                world.shutdown();
                true
            }
            None => false,
        }
    }

    /// Ids of all registered worlds (unordered).
    pub fn ids(&self) -> impl Iterator<Item = WorldId> + '_ {
        self.worlds.keys().copied()
    }

    /// Iterate all registered worlds mutably (reload broadcasts).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut World> {
        self.worlds.values_mut()
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

impl Default for WorldRegistry {
    fn default() -> Self {
        Self::new()
    }
}
