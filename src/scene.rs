//! Active-scene tracking.
//!
//! Worlds live in the [`WorldRegistry`](ember_ecs::WorldRegistry); this
//! module tracks which of them are active, i.e. updated and drawn each
//! frame. The tracker is itself a global system so scene flips happen in
//! engine order like everything else.

use ember_core::WorldId;
use ember_ecs::System;
use tracing::info;

/// Scene activation changes since the last [`SceneSystem::take_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    Added(WorldId),
    Removed(WorldId),
}

/// Tracks the active scene stack and the activation events of the current
/// frame.
#[derive(Default)]
pub struct SceneSystem {
    active: Vec<WorldId>,
    events: Vec<SceneEvent>,
}

impl SceneSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` the only active scene. Currently active scenes deactivate
    /// first, most recent first, then the new scene activates.
    pub fn load_scene(&mut self, id: WorldId) {
        while let Some(old) = self.active.pop() {
            info!(world = %old, "scene deactivated");
            self.events.push(SceneEvent::Removed(old));
        }
        self.push_scene(id);
    }

    /// Activate `id` on top of whatever is already active. Idempotent.
    pub fn push_scene(&mut self, id: WorldId) {
        if self.active.contains(&id) {
            return;
        }
        info!(world = %id, "scene activated");
        self.active.push(id);
        self.events.push(SceneEvent::Added(id));
    }

    /// Deactivate one scene. Returns `false` if it was not active.
    pub fn unload_scene(&mut self, id: WorldId) -> bool {
        let Some(pos) = self.active.iter().position(|&w| w == id) else {
            return false;
        };
        self.active.remove(pos);
        info!(world = %id, "scene deactivated");
        self.events.push(SceneEvent::Removed(id));
        true
    }

    /// Active scenes, in activation order.
    pub fn active_scenes(&self) -> &[WorldId] {
        &self.active
    }

    pub fn is_active(&self, id: WorldId) -> bool {
        self.active.contains(&id)
    }

    /// Drain the pending activation events, in the order they happened.
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}

impl System for SceneSystem {}
