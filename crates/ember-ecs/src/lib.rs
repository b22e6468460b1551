//! Ember ECS - Entity Component System
//!
//! Per-world entity allocation, dense per-type component storage, and the
//! system lifecycle/scheduling layer. Entity ids are process-unique 64-bit
//! values; storage is packed for cache-friendly iteration.
//!
//! The frame loop is single-threaded by design, so components and systems
//! require only `'static`, not `Send + Sync`.

mod component;
mod entity;
mod error;
mod hierarchy;
mod system;
mod world;

pub use component::{Component, ComponentManager};
pub use entity::EntityManager;
pub use error::EcsError;
pub use system::{AsAny, System, SystemManager, WorldCtx};
pub use world::{World, WorldRegistry};
