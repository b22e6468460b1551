use std::collections::HashMap;

use ember_core::{EntityId, Uid};

use crate::component::ComponentManager;

/// Slots are grown this many at a time when the free list runs dry.
const ENTITY_CHUNK: usize = 256;

/// Per-world allocator of entity identifiers.
///
/// Tracks which slots are live and which ids occupy them. Storage grows in
/// chunks for amortized O(1) allocation and never shrinks (deferred by
/// design; a world's slot high-water mark is retained until the world is
/// dropped).
pub struct EntityManager {
    /// Slot table; `EntityId::INVALID` marks a free slot.
    slots: Vec<EntityId>,
    /// Free slot indices, most recently freed last.
    free: Vec<usize>,
    /// Reverse lookup from live id to its slot.
    index: HashMap<EntityId, usize>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Allocate a new entity id. Never fails; grows slot storage in chunks
    /// when the free list is exhausted.
    pub fn create(&mut self) -> EntityId {
        let slot = self.take_free_slot();
        let id = Uid::generate();
        self.slots[slot] = id;
        self.index.insert(id, slot);
        id
    }

    /// Destroy an entity, clearing all of its components first so nothing
    /// survives into a future reuse of the id's slot.
    ///
    /// Returns `false` if the id is not live in this world.
    pub fn destroy(&mut self, id: EntityId, components: &mut ComponentManager) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        components.clear(id);
        self.slots[slot] = EntityId::INVALID;
        self.free.push(slot);
        true
    }

    /// Reserve a specific, externally supplied id (world deserialization).
    /// Returns `false` on collision with a live id or the invalid id.
    pub fn insert(&mut self, id: EntityId) -> bool {
        if !id.is_valid() || self.index.contains_key(&id) {
            return false;
        }
        let slot = self.take_free_slot();
        self.slots[slot] = id;
        self.index.insert(id, slot);
        true
    }

    /// Whether the given id is live in this world.
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// All live entity ids, in slot order. The order is stable within a
    /// single enumeration.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().copied().filter(|id| id.is_valid())
    }

    /// Pre-grow storage so at least `count` further allocations succeed
    /// without a reallocation.
    pub fn prepare(&mut self, count: usize) {
        while self.free.len() < count {
            self.grow_chunk();
        }
        self.index.reserve(count);
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn take_free_slot(&mut self) -> usize {
        loop {
            if let Some(slot) = self.free.pop() {
                return slot;
            }
            self.grow_chunk();
        }
    }

    fn grow_chunk(&mut self) {
        let start = self.slots.len();
        self.slots.resize(start + ENTITY_CHUNK, EntityId::INVALID);
        // Push in reverse so lower slots are handed out first.
        for slot in (start..start + ENTITY_CHUNK).rev() {
            self.free.push(slot);
        }
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}
