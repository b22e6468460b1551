//! Ember - an entity/component/system runtime with a hot-reloadable
//! scripting bridge.
//!
//! The engine owns a registry of worlds (scenes), a global system set that
//! runs against whichever scenes are active, and the script engine that
//! pairs native systems and components with managed instances. Simulation
//! is single-threaded; background work crosses back over a main-thread
//! command queue.

mod audio;
mod descriptor;
mod engine;
mod render;
mod scene;

pub use audio::{AudioSink, AudioSource, AudioSystem, NullSink};
pub use descriptor::{EntityRecord, SceneDescriptor, SceneError, TransformRecord};
pub use engine::{Engine, EngineCommand};
pub use render::{Camera, CameraView, MeshDraw, MeshRenderer, NullBackend, RenderBackend, RenderSystem};
pub use scene::{SceneEvent, SceneSystem};

pub use ember_core::{
    stable_name_hash, stable_type_hash, Color, EntityId, GameTime, MainThreadQueue, PhysicalFs,
    TimeConfig, Timer, Transform, Uid, Vfs, VfsError, WorldId,
};
pub use ember_ecs::{
    Component, ComponentManager, EcsError, EntityManager, System, SystemManager, World, WorldCtx,
    WorldRegistry,
};
pub use ember_scripting::{
    add_script_system, GcHandle, ManagedData, ManagedRuntime, ScriptBehavior, ScriptBehaviorSystem,
    ScriptEngine, ScriptError, ScriptFault, ScriptValue, SharedScripts,
};

#[cfg(feature = "rhai")]
pub use ember_scripting::RhaiRuntime;
