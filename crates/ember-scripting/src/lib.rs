//! Ember Scripting - the managed-runtime bridge
//!
//! Keeps native systems and components paired with instances living in an
//! embedded, garbage-collected, hot-reloadable scripting runtime. The
//! runtime itself sits behind the [`ManagedRuntime`] capability trait so
//! any embedding (rhai ships in-tree behind the `rhai` feature) is
//! substitutable.
//!
//! Native code never holds a raw reference into the runtime. It holds an
//! epoch-tagged [`GcHandle`]; a hot reload bumps the epoch, so every
//! pre-reload handle goes stale at once and any use of it degrades to a
//! no-op instead of a fault.

mod behavior;
mod engine;
mod error;
mod handle;
mod runtime;
mod value;

#[cfg(feature = "rhai")]
mod rhai_runtime;

pub use behavior::{
    add_script_system, invalidate_world, rebind_world, ScriptBehavior, ScriptBehaviorSystem,
    ScriptSystem, SharedScripts,
};
pub use engine::ScriptEngine;
pub use error::{ScriptError, ScriptFault};
pub use handle::{GcHandle, HandleTable, ManagedData};
pub use runtime::{Assembly, AssemblySource, InstanceId, ManagedRuntime};
pub use value::ScriptValue;

#[cfg(feature = "rhai")]
pub use rhai_runtime::RhaiRuntime;
