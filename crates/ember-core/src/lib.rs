//! Ember Core - shared types and utilities
//!
//! Provides the process-wide id generator, transform and color types,
//! frame timing, the main-thread dispatch queue, and the virtual
//! file system abstraction used by the rest of the engine.

pub mod dispatch;
pub mod ids;
pub mod time;
pub mod types;
pub mod vfs;

pub use dispatch::{MainThreadQueue, Timer};
pub use ids::{stable_name_hash, stable_type_hash, EntityId, Uid, WorldId};
pub use time::{GameTime, TimeConfig};
pub use types::{Color, Transform};
pub use vfs::{PhysicalFs, Vfs, VfsError};
