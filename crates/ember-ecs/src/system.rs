use std::any::Any;
use std::collections::HashMap;

use ember_core::stable_type_hash;
use tracing::debug;

use crate::component::ComponentManager;
use crate::entity::EntityManager;

/// Blanket downcast support for trait objects.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Split-borrow frame context handed to systems: the owning world's entity
/// and component managers plus this frame's delta time.
pub struct WorldCtx<'a> {
    pub entities: &'a mut EntityManager,
    pub components: &'a mut ComponentManager,
    pub dt: f32,
}

/// A per-frame behavioral unit, native or script-backed.
///
/// Lifecycle: `init` once when added, `on_enabled`/`on_disabled` on state
/// transitions, `destroy` once on removal (terminal). Script-backed systems
/// additionally receive `reload_before`/`reload_after` around a scripting
/// hot reload.
#[allow(unused_variables)]
pub trait System: AsAny + 'static {
    fn init(&mut self) {}
    fn update(&mut self, world: &mut WorldCtx<'_>) {}
    fn draw(&mut self, world: &mut WorldCtx<'_>) {}
    fn on_enabled(&mut self) {}
    fn on_disabled(&mut self) {}
    fn destroy(&mut self) {}

    /// Managed instances are about to be invalidated; drop anything cached.
    fn reload_before(&mut self) {}
    /// A fresh managed runtime is up; re-bind and resume callbacks.
    fn reload_after(&mut self) {}
}

struct SystemEntry {
    hash: u64,
    name: String,
    system: Box<dyn System>,
    enabled: bool,
}

/// Owns the set of active systems for one world (or the engine-global set)
/// and dispatches lifecycle and per-frame callbacks.
///
/// Identity is a stable type hash, so script-backed systems (one native
/// shim type, many script classes) participate like native ones. One
/// instance per identity; update/draw run in insertion order, which keeps
/// scheduling reproducible across runs.
pub struct SystemManager {
    entries: Vec<SystemEntry>,
    index: HashMap<u64, usize>,
}

impl SystemManager {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a native system, constructing it with `Default`. Idempotent: if
    /// an instance of `T` is already registered it is returned unchanged
    /// and `init` does not run again. New systems start enabled.
    pub fn add<T: System + Default>(&mut self) -> &mut T {
        self.add_with(T::default)
    }

    /// Like [`SystemManager::add`] but constructs the system with a closure,
    /// for systems that take dependencies at construction time.
    pub fn add_with<T: System>(&mut self, make: impl FnOnce() -> T) -> &mut T {
        let hash = stable_type_hash::<T>();
        if let Some(&i) = self.index.get(&hash) {
            // Deref past the Box first: the box itself is `Any`, and the
            // downcast must see the system inside it.
            return self.entries[i]
                .system
                .as_mut()
                .as_any_mut()
                .downcast_mut::<T>()
                .expect("system identity hash collision");
        }
        self.push_entry(hash, std::any::type_name::<T>().to_string(), Box::new(make()));
        let i = self.entries.len() - 1;
        self.entries[i]
            .system
            .as_mut()
            .as_any_mut()
            .downcast_mut::<T>()
            .expect("system identity hash collision")
    }

    /// Register an already-constructed system under an explicit identity
    /// hash (script-backed systems use their managed class name's hash).
    /// Idempotent on the hash: an existing instance wins and the new box
    /// is dropped.
    pub fn add_boxed(
        &mut self,
        hash: u64,
        name: impl Into<String>,
        system: Box<dyn System>,
    ) -> &mut dyn System {
        if let Some(&i) = self.index.get(&hash) {
            return self.entries[i].system.as_mut();
        }
        self.push_entry(hash, name.into(), system);
        let i = self.entries.len() - 1;
        self.entries[i].system.as_mut()
    }

    fn push_entry(&mut self, hash: u64, name: String, mut system: Box<dyn System>) {
        system.init();
        system.on_enabled();
        debug!(system = %name, "system added");
        self.index.insert(hash, self.entries.len());
        self.entries.push(SystemEntry {
            hash,
            name,
            system,
            enabled: true,
        });
    }

    /// Get the registered instance of `T`, if any.
    pub fn get<T: System>(&self) -> Option<&T> {
        let i = *self.index.get(&stable_type_hash::<T>())?;
        self.entries[i].system.as_ref().as_any().downcast_ref::<T>()
    }

    /// Get the registered instance of `T` mutably, if any.
    pub fn get_mut<T: System>(&mut self) -> Option<&mut T> {
        let i = *self.index.get(&stable_type_hash::<T>())?;
        self.entries[i]
            .system
            .as_mut()
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Get a system by identity hash.
    pub fn get_by_hash(&self, hash: u64) -> Option<&dyn System> {
        let i = *self.index.get(&hash)?;
        Some(self.entries[i].system.as_ref())
    }

    /// Get a system by identity hash, mutably.
    pub fn get_by_hash_mut(&mut self, hash: u64) -> Option<&mut dyn System> {
        let i = *self.index.get(&hash)?;
        Some(self.entries[i].system.as_mut())
    }

    /// Whether a system of type `T` is registered.
    pub fn contains<T: System>(&self) -> bool {
        self.index.contains_key(&stable_type_hash::<T>())
    }

    /// Remove the system of type `T`. `destroy` fires once; returns `false`
    /// if absent.
    pub fn remove<T: System>(&mut self) -> bool {
        self.remove_by_hash(stable_type_hash::<T>())
    }

    /// Remove a system by identity hash.
    pub fn remove_by_hash(&mut self, hash: u64) -> bool {
        let Some(i) = self.index.remove(&hash) else {
            return false;
        };
        let mut entry = self.entries.remove(i);
        if entry.enabled {
            entry.system.on_disabled();
        }
        entry.system.destroy();
        debug!(system = %entry.name, "system removed");
        // Re-point indices shifted by the removal.
        for (j, e) in self.entries.iter().enumerate().skip(i) {
            self.index.insert(e.hash, j);
        }
        true
    }

    /// Enable or disable a system. The matching hook fires exactly once per
    /// actual transition; same-state requests are no-ops. Returns `false`
    /// if the system is absent.
    pub fn set_enabled<T: System>(&mut self, enabled: bool) -> bool {
        self.set_enabled_by_hash(stable_type_hash::<T>(), enabled)
    }

    /// Enable or disable a system by identity hash.
    pub fn set_enabled_by_hash(&mut self, hash: u64, enabled: bool) -> bool {
        let Some(&i) = self.index.get(&hash) else {
            return false;
        };
        let entry = &mut self.entries[i];
        if entry.enabled == enabled {
            return true;
        }
        entry.enabled = enabled;
        if enabled {
            entry.system.on_enabled();
        } else {
            entry.system.on_disabled();
        }
        true
    }

    /// Run `update` for every enabled system, in insertion order.
    pub fn update(&mut self, ctx: &mut WorldCtx<'_>) {
        for entry in &mut self.entries {
            if entry.enabled {
                entry.system.update(ctx);
            }
        }
    }

    /// Run `draw` for every enabled system, in insertion order.
    pub fn draw(&mut self, ctx: &mut WorldCtx<'_>) {
        for entry in &mut self.entries {
            if entry.enabled {
                entry.system.draw(ctx);
            }
        }
    }

    /// Visit every system (enabled or not), in insertion order. Used for
    /// reload broadcasts.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut dyn System)) {
        for entry in &mut self.entries {
            f(entry.system.as_mut());
        }
    }

    /// Destroy and drop every system, in insertion order.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            if entry.enabled {
                entry.system.on_disabled();
                entry.enabled = false;
            }
            entry.system.destroy();
        }
        self.entries.clear();
        self.index.clear();
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SystemManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SystemManager {
    fn drop(&mut self) {
        self.clear();
    }
}
