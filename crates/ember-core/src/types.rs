//! Core component types shared across the engine.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// Transform component representing position, rotation, and scale, plus an
/// intra-world parent/child relation stored by entity id.
///
/// The relation is ownership-by-id: a parent never owns a child's lifetime
/// (component storage does). `ComponentManager` keeps `parent` and
/// `children` mutually consistent and detaches both sides when an entity
/// is destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Owning entity's parent, `EntityId::INVALID` when unparented.
    #[serde(default)]
    pub parent: EntityId,
    /// Entities parented to this one.
    #[serde(default)]
    pub children: Vec<EntityId>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: EntityId::INVALID,
            children: Vec::new(),
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Compute the local model matrix for this transform.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the forward direction (negative Z in local space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Translate by the given offset.
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Whether this transform has a parent.
    pub fn has_parent(&self) -> bool {
        self.parent.is_valid()
    }
}

/// RGBA color with floating point components (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    /// Create a color from RGB values (alpha = 1.0).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Convert to an array [r, g, b, a].
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
