//! TOML scene descriptors.
//!
//! A descriptor is the serialized form of a world: a name plus entity
//! records with author-assigned ids. Record ids are small integers chosen
//! by the scene author (TOML integers are signed 64-bit, so generated uids
//! do not fit); on instantiation they become the entities' runtime ids via
//! reservation, and references between records (parenting) use them
//! directly.

use ember_core::{EntityId, Transform, Uid};
use ember_ecs::World;
use ember_scripting::ScriptBehavior;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene parse failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("scene serialization failed: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] ember_core::VfsError),

    #[error("entity id 0 is reserved")]
    ReservedId,

    #[error("duplicate entity id {0}")]
    IdCollision(u64),

    #[error("entity {0} references unknown parent {1}")]
    UnknownParent(u64, u64),
}

/// Serialized transform. Omitted fields take the identity defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Default for TransformRecord {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: identity_rotation(),
            scale: unit_scale(),
        }
    }
}

impl TransformRecord {
    fn to_transform(&self) -> Transform {
        Transform {
            position: Vec3::from_array(self.position),
            rotation: Quat::from_array(self.rotation),
            scale: Vec3::from_array(self.scale),
            ..Default::default()
        }
    }
}

/// One serialized entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Author-assigned id, unique within the descriptor, never 0.
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Record id of the parent entity, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformRecord>,
    /// Managed class driving this entity, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// A serialized world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    pub name: String,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

impl SceneDescriptor {
    pub fn from_toml(source: &str) -> Result<Self, SceneError> {
        Ok(toml::from_str(source)?)
    }

    pub fn to_toml(&self) -> Result<String, SceneError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build a world from this descriptor. Entities are reserved under
    /// their record ids first, then parented, so records may reference
    /// entities declared later.
    pub fn instantiate(&self) -> Result<World, SceneError> {
        let mut world = World::new(&self.name);
        world.entities.prepare(self.entities.len());

        for record in &self.entities {
            if record.id == 0 {
                return Err(SceneError::ReservedId);
            }
            let id = Uid(record.id);
            if !world.entities.insert(id) {
                return Err(SceneError::IdCollision(record.id));
            }
            if let Some(transform) = &record.transform {
                // Fresh reservation, so the insert cannot collide.
                let _ = world.components.insert(id, transform.to_transform());
            }
            if let Some(class) = &record.script {
                let _ = world.components.insert(id, ScriptBehavior::new(class));
            }
        }

        for record in &self.entities {
            let Some(parent) = record.parent else {
                continue;
            };
            let parent_id = Uid(parent);
            if !world.entities.contains(parent_id) {
                return Err(SceneError::UnknownParent(record.id, parent));
            }
            let child_id = Uid(record.id);
            ensure_transform(&mut world, child_id);
            ensure_transform(&mut world, parent_id);
            world.components.set_parent(child_id, parent_id);
        }

        info!(scene = %self.name, entities = self.entities.len(), "scene instantiated");
        Ok(world)
    }
}

/// Parenting needs a transform on both ends; records may omit theirs.
fn ensure_transform(world: &mut World, id: EntityId) {
    if !world.components.has::<Transform>(id) {
        let _ = world.components.insert(id, Transform::default());
    }
}
