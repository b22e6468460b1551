use std::path::PathBuf;

use crate::error::{ScriptError, ScriptFault};
use crate::value::ScriptValue;

/// An opaque token for a live object inside the managed runtime. Only the
/// runtime interprets it; native code pins it through a `GcHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u64);

/// Where an assembly's bytes come from. Byte sources are retained verbatim
/// so a hot reload can replay assemblies that were loaded from
/// non-re-readable sources (embedded or generated code); path sources are
/// re-read at reload time.
#[derive(Debug, Clone)]
pub enum AssemblySource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// One loaded (or load-attempted) scripting assembly.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub name: String,
    pub source: AssemblySource,
    /// False when the last load attempt failed; script classes from this
    /// assembly then behave as if scripting were absent.
    pub loaded: bool,
}

/// Capability interface over a managed scripting runtime. The ECS core
/// depends only on this trait, never on a concrete embedding.
///
/// Runtimes are not required to be `Send`; invocation happens synchronously
/// on the simulation thread.
pub trait ManagedRuntime {
    /// Load (or replace) an assembly from raw bytes.
    fn load_assembly(&mut self, name: &str, bytes: &[u8]) -> Result<(), ScriptError>;

    /// Drop every assembly and instance. The reload protocol calls this
    /// after all handles have been released.
    fn unload_all(&mut self);

    /// Whether a class with this name is resolvable.
    fn has_class(&self, class: &str) -> bool;

    /// Instantiate a managed object of the given class.
    fn create_instance(&mut self, class: &str) -> Result<InstanceId, ScriptError>;

    /// Destroy a managed instance. Unknown ids are a no-op.
    fn destroy_instance(&mut self, instance: InstanceId);

    /// Invoke a method on an instance with marshalled arguments. Script
    /// exceptions surface as `Err(ScriptFault)`, never as panics.
    fn invoke(
        &mut self,
        instance: InstanceId,
        method: &str,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptFault>;
}
