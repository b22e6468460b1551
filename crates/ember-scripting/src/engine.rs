use std::path::Path;

use ember_core::Vfs;
use tracing::{debug, error, info, warn};

use crate::error::{ScriptError, ScriptFault};
use crate::handle::{GcHandle, HandleTable};
use crate::runtime::{Assembly, AssemblySource, ManagedRuntime};
use crate::value::ScriptValue;

/// Owns the managed runtime, the loaded assemblies (with retained sources),
/// and the GC-handle table. Orchestrates the hot-reload protocol.
///
/// A reload is requested with a flag and performed later at a safe point
/// (the top of the frame loop), never mid-callback.
pub struct ScriptEngine {
    runtime: Box<dyn ManagedRuntime>,
    assemblies: Vec<Assembly>,
    handles: HandleTable,
    reload_requested: bool,
}

impl ScriptEngine {
    pub fn new(runtime: Box<dyn ManagedRuntime>) -> Self {
        Self {
            runtime,
            assemblies: Vec::new(),
            handles: HandleTable::new(),
            reload_requested: false,
        }
    }

    // ---- Assembly loading ----

    /// Load an assembly from a byte buffer. The buffer is retained so the
    /// assembly can be replayed on reload even when its origin cannot be
    /// re-read.
    ///
    /// On failure the error is reported and previously loaded assemblies
    /// remain valid.
    pub fn load_assembly_bytes(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), ScriptError> {
        match self.runtime.load_assembly(name, &bytes) {
            Ok(()) => {
                info!(assembly = name, size = bytes.len(), "assembly loaded");
                self.record_assembly(name, AssemblySource::Bytes(bytes), true);
                Ok(())
            }
            Err(e) => {
                error!(assembly = name, error = %e, "assembly load failed");
                Err(e)
            }
        }
    }

    /// Load an assembly from a path through the virtual file system. The
    /// path is retained and re-read on reload.
    pub fn load_assembly_path(&mut self, vfs: &dyn Vfs, path: &Path) -> Result<(), ScriptError> {
        let name = assembly_name(path);
        let bytes = vfs
            .read(path)
            .map_err(|e| ScriptError::SourceUnavailable(name.clone(), e.to_string()))?;
        match self.runtime.load_assembly(&name, &bytes) {
            Ok(()) => {
                info!(assembly = %name, path = %path.display(), "assembly loaded");
                self.record_assembly(&name, AssemblySource::Path(path.to_path_buf()), true);
                Ok(())
            }
            Err(e) => {
                error!(assembly = %name, error = %e, "assembly load failed");
                Err(e)
            }
        }
    }

    fn record_assembly(&mut self, name: &str, source: AssemblySource, loaded: bool) {
        if let Some(existing) = self.assemblies.iter_mut().find(|a| a.name == name) {
            existing.source = source;
            existing.loaded = loaded;
        } else {
            self.assemblies.push(Assembly {
                name: name.to_string(),
                source,
                loaded,
            });
        }
    }

    /// Names of all recorded assemblies, in load order.
    pub fn assembly_names(&self) -> impl Iterator<Item = &str> {
        self.assemblies.iter().map(|a| a.name.as_str())
    }

    /// Whether a script class is currently resolvable.
    pub fn has_class(&self, class: &str) -> bool {
        self.runtime.has_class(class)
    }

    // ---- Instance binding ----

    /// Create a managed instance of `class` and pin it, returning the
    /// handle the native side keeps.
    pub fn bind_instance(&mut self, class: &str) -> Result<GcHandle, ScriptError> {
        let instance = self.runtime.create_instance(class)?;
        let handle = self.handles.pin(instance);
        debug!(class, ?handle, "managed instance bound");
        Ok(handle)
    }

    /// Release one pinned instance. Stale or sentinel handles are a no-op.
    pub fn release(&mut self, handle: GcHandle) {
        if let Some(instance) = self.handles.release(handle) {
            self.runtime.destroy_instance(instance);
        }
    }

    /// Invoke a method on a pinned instance.
    ///
    /// An unbound or stale handle (the post-invalidation, pre-rebind
    /// window) is not an error: the call degrades to a no-op returning
    /// `Unit`. Script exceptions come back as `Err(ScriptFault)` for the
    /// caller to log; they never cross the boundary as panics.
    pub fn invoke(
        &mut self,
        handle: GcHandle,
        method: &str,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptFault> {
        let Some(instance) = self.handles.resolve(handle) else {
            debug!(method, ?handle, "invoke on unbound handle skipped");
            return Ok(ScriptValue::Unit);
        };
        self.runtime.invoke(instance, method, args)
    }

    /// Number of live managed pins.
    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    /// Current handle epoch; advances once per reload.
    pub fn epoch(&self) -> u32 {
        self.handles.epoch()
    }

    // ---- Hot reload ----

    /// Flag a reload. Deferred to the next frame boundary so managed state
    /// is never torn down mid-callback.
    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    pub fn reload_pending(&self) -> bool {
        self.reload_requested
    }

    /// Reload steps 3-4: release every GC handle (epoch bump), tear down
    /// the managed context, and reload each retained assembly. Load
    /// failures are logged and skipped; their classes behave as absent
    /// until the next successful reload.
    ///
    /// Callers broadcast `reload_before` beforehand and rebind/broadcast
    /// `reload_after` afterwards.
    pub fn reload_now(&mut self, vfs: &dyn Vfs) {
        self.reload_requested = false;
        info!(assemblies = self.assemblies.len(), "scripting reload started");

        for instance in self.handles.invalidate_all() {
            self.runtime.destroy_instance(instance);
        }
        self.runtime.unload_all();

        for assembly in &mut self.assemblies {
            let bytes = match &assembly.source {
                AssemblySource::Bytes(bytes) => bytes.clone(),
                AssemblySource::Path(path) => match vfs.read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        error!(assembly = %assembly.name, error = %e, "assembly source unreadable on reload");
                        assembly.loaded = false;
                        continue;
                    }
                },
            };
            match self.runtime.load_assembly(&assembly.name, &bytes) {
                Ok(()) => assembly.loaded = true,
                Err(e) => {
                    warn!(assembly = %assembly.name, error = %e, "assembly reload failed");
                    assembly.loaded = false;
                }
            }
        }
        info!(epoch = self.handles.epoch(), "scripting reload finished");
    }
}

fn assembly_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::InstanceId;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::rc::Rc;

    /// Recording fake runtime: loads anything, counts instances, and
    /// fails invocations on demand.
    #[derive(Default)]
    struct FakeRuntime {
        log: Rc<RefCell<Vec<String>>>,
        classes: Vec<String>,
        next: u64,
        live: HashMap<u64, String>,
        fail_method: Option<String>,
        reject_load: bool,
    }

    impl ManagedRuntime for FakeRuntime {
        fn load_assembly(&mut self, name: &str, _bytes: &[u8]) -> Result<(), ScriptError> {
            if self.reject_load {
                return Err(ScriptError::LoadFailed(name.into(), "rejected".into()));
            }
            self.classes.push(name.to_string());
            self.log.borrow_mut().push(format!("load:{name}"));
            Ok(())
        }

        fn unload_all(&mut self) {
            self.classes.clear();
            self.live.clear();
            self.log.borrow_mut().push("unload_all".into());
        }

        fn has_class(&self, class: &str) -> bool {
            self.classes.iter().any(|c| c == class)
        }

        fn create_instance(&mut self, class: &str) -> Result<InstanceId, ScriptError> {
            if !self.has_class(class) {
                return Err(ScriptError::UnknownClass(class.into()));
            }
            self.next += 1;
            self.live.insert(self.next, class.to_string());
            Ok(InstanceId(self.next))
        }

        fn destroy_instance(&mut self, instance: InstanceId) {
            self.live.remove(&instance.0);
        }

        fn invoke(
            &mut self,
            instance: InstanceId,
            method: &str,
            _args: &[ScriptValue],
        ) -> Result<ScriptValue, ScriptFault> {
            if self.fail_method.as_deref() == Some(method) {
                return Err(ScriptFault::Exception(method.into(), "boom".into()));
            }
            self.log
                .borrow_mut()
                .push(format!("invoke:{}:{method}", instance.0));
            Ok(ScriptValue::Unit)
        }
    }

    struct EmptyFs;
    impl Vfs for EmptyFs {
        fn read(&self, path: &Path) -> Result<Vec<u8>, ember_core::VfsError> {
            Err(ember_core::VfsError::NotFound(path.to_path_buf()))
        }
        fn write(&self, _: &Path, _: &[u8]) -> Result<(), ember_core::VfsError> {
            Ok(())
        }
        fn exists(&self, _: &Path) -> bool {
            false
        }
    }

    fn engine_with_fake() -> (ScriptEngine, Rc<RefCell<Vec<String>>>) {
        let runtime = FakeRuntime::default();
        let log = runtime.log.clone();
        (ScriptEngine::new(Box::new(runtime)), log)
    }

    #[test]
    fn bind_and_invoke_round_trip() {
        let (mut engine, log) = engine_with_fake();
        engine.load_assembly_bytes("player", b"code".to_vec()).unwrap();
        let handle = engine.bind_instance("player").unwrap();
        engine.invoke(handle, "on_update", &[]).unwrap();
        assert!(log.borrow().iter().any(|l| l.contains("invoke")));
        assert_eq!(engine.live_handles(), 1);
    }

    #[test]
    fn unbound_handle_invocation_is_a_noop() {
        let (mut engine, log) = engine_with_fake();
        let result = engine.invoke(GcHandle::INVALID, "on_update", &[]);
        assert_eq!(result, Ok(ScriptValue::Unit));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stale_handle_after_reload_is_a_noop() {
        let (mut engine, log) = engine_with_fake();
        engine.load_assembly_bytes("player", b"code".to_vec()).unwrap();
        let stale = engine.bind_instance("player").unwrap();

        engine.request_reload();
        assert!(engine.reload_pending());
        engine.reload_now(&EmptyFs);
        assert!(!engine.reload_pending());

        log.borrow_mut().clear();
        assert_eq!(engine.invoke(stale, "on_update", &[]), Ok(ScriptValue::Unit));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn reload_replays_retained_byte_sources() {
        let (mut engine, log) = engine_with_fake();
        engine.load_assembly_bytes("player", b"code".to_vec()).unwrap();
        engine.load_assembly_bytes("enemy", b"code".to_vec()).unwrap();

        let epoch_before = engine.epoch();
        engine.reload_now(&EmptyFs);

        assert_eq!(engine.epoch(), epoch_before + 1);
        let entries = log.borrow();
        let reload_tail: Vec<&String> = entries
            .iter()
            .skip_while(|l| l.as_str() != "unload_all")
            .collect();
        assert_eq!(reload_tail.len(), 3); // unload + two replays
        assert!(engine.has_class("player") && engine.has_class("enemy"));
    }

    #[test]
    fn fresh_bindings_differ_after_reload() {
        let (mut engine, _) = engine_with_fake();
        engine.load_assembly_bytes("player", b"code".to_vec()).unwrap();
        let before = engine.bind_instance("player").unwrap();
        engine.reload_now(&EmptyFs);
        let after = engine.bind_instance("player").unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn load_failure_keeps_prior_assemblies() {
        let (mut engine, _) = engine_with_fake();
        engine.load_assembly_bytes("player", b"code".to_vec()).unwrap();

        // Swap in a rejecting runtime state via a second engine.
        let mut rejecting = FakeRuntime::default();
        rejecting.reject_load = true;
        let mut engine2 = ScriptEngine::new(Box::new(rejecting));
        assert!(engine2.load_assembly_bytes("bad", b"x".to_vec()).is_err());
        assert_eq!(engine2.assembly_names().count(), 0);

        assert!(engine.has_class("player"));
    }

    #[test]
    fn script_exception_is_reported_not_propagated() {
        let mut runtime = FakeRuntime::default();
        runtime.fail_method = Some("on_update".into());
        let mut engine = ScriptEngine::new(Box::new(runtime));
        engine.load_assembly_bytes("player", b"code".to_vec()).unwrap();
        let handle = engine.bind_instance("player").unwrap();

        let fault = engine.invoke(handle, "on_update", &[]).unwrap_err();
        assert!(matches!(fault, ScriptFault::Exception(_, _)));
        // The engine stays usable.
        assert_eq!(engine.invoke(handle, "on_draw", &[]), Ok(ScriptValue::Unit));
    }

    #[test]
    fn path_sources_reread_failure_marks_unloaded() {
        let (mut engine, _) = engine_with_fake();
        // Record a path-sourced assembly by loading bytes, then rewriting
        // the record as a path source through the public path API is not
        // possible without a readable fs, so simulate via reload: a path
        // source that cannot be read must not abort the reload.
        engine.load_assembly_bytes("player", b"code".to_vec()).unwrap();
        engine.assemblies.push(Assembly {
            name: "ghost".into(),
            source: AssemblySource::Path(PathBuf::from("missing.rhai")),
            loaded: true,
        });

        engine.reload_now(&EmptyFs);

        assert!(engine.has_class("player"));
        let ghost = engine.assemblies.iter().find(|a| a.name == "ghost").unwrap();
        assert!(!ghost.loaded);
    }
}
