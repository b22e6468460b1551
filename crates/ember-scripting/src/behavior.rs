use std::cell::RefCell;
use std::rc::Rc;

use ember_core::stable_name_hash;
use ember_ecs::{ComponentManager, System, SystemManager, WorldCtx};
use tracing::{debug, warn};

use crate::engine::ScriptEngine;
use crate::error::{ScriptError, ScriptFault};
use crate::handle::ManagedData;
use crate::value::ScriptValue;

/// The script engine as shared by systems on the simulation thread.
pub type SharedScripts = Rc<RefCell<ScriptEngine>>;

const ON_UPDATE: &str = "on_update";
const ON_DRAW: &str = "on_draw";

/// A component whose behavior lives in a managed script class. The native
/// side stores only the bridge state; [`ScriptBehaviorSystem`] drives it.
#[derive(Debug, Clone, Default)]
pub struct ScriptBehavior {
    pub managed: ManagedData,
}

impl ScriptBehavior {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            managed: ManagedData::new(class),
        }
    }
}

/// Drives every [`ScriptBehavior`] in a world: binds unbound behaviors
/// lazily and forwards the per-frame update into the managed runtime.
pub struct ScriptBehaviorSystem {
    scripts: SharedScripts,
}

impl ScriptBehaviorSystem {
    pub fn new(scripts: SharedScripts) -> Self {
        Self { scripts }
    }
}

impl System for ScriptBehaviorSystem {
    fn update(&mut self, world: &mut WorldCtx<'_>) {
        let mut scripts = self.scripts.borrow_mut();
        for (entity, behavior) in world.components.components_mut::<ScriptBehavior>() {
            let managed = &mut behavior.managed;
            if !managed.callbacks_enabled || managed.class.is_empty() {
                continue;
            }
            if !managed.is_bound() {
                match scripts.bind_instance(&managed.class) {
                    Ok(handle) => managed.handle = handle,
                    Err(e) => {
                        warn!(%entity, class = %managed.class, error = %e, "script behavior bind failed");
                        managed.callbacks_enabled = false;
                        continue;
                    }
                }
            }
            match scripts.invoke(managed.handle, ON_UPDATE, &[ScriptValue::Float(world.dt as f64)])
            {
                Ok(_) => {}
                Err(ScriptFault::MethodNotFound(_)) => {
                    debug!(class = %managed.class, "behavior has no update callback, muting");
                    managed.callbacks_enabled = false;
                }
                Err(fault) => {
                    warn!(%entity, class = %managed.class, error = %fault, "script behavior update faulted");
                }
            }
        }
    }
}

/// A world-scheduled system implemented by a managed class. One native shim
/// type serves any number of script classes; identity comes from the class
/// name's stable hash, not the Rust type.
pub struct ScriptSystem {
    class: String,
    managed: ManagedData,
    scripts: SharedScripts,
    update_missing: bool,
    draw_missing: bool,
}

impl ScriptSystem {
    pub fn new(scripts: SharedScripts, class: impl Into<String>) -> Self {
        let class = class.into();
        Self {
            managed: ManagedData::new(class.clone()),
            class,
            scripts,
            update_missing: false,
            draw_missing: false,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    fn bind(&mut self) {
        match self.scripts.borrow_mut().bind_instance(&self.class) {
            Ok(handle) => {
                self.managed.handle = handle;
                self.managed.callbacks_enabled = true;
            }
            Err(e) => {
                warn!(class = %self.class, error = %e, "script system bind failed");
                self.managed.callbacks_enabled = false;
            }
        }
    }

    fn call(&mut self, method: &str, dt: f32, missing: &mut bool) {
        if !self.managed.callbacks_enabled || *missing {
            return;
        }
        let result = self.scripts.borrow_mut().invoke(
            self.managed.handle,
            method,
            &[ScriptValue::Float(dt as f64)],
        );
        match result {
            Ok(_) => {}
            Err(ScriptFault::MethodNotFound(_)) => *missing = true,
            Err(fault) => {
                warn!(class = %self.class, error = %fault, "script system callback faulted");
            }
        }
    }
}

impl System for ScriptSystem {
    fn init(&mut self) {
        self.bind();
    }

    fn update(&mut self, world: &mut WorldCtx<'_>) {
        let dt = world.dt;
        let mut missing = self.update_missing;
        self.call(ON_UPDATE, dt, &mut missing);
        self.update_missing = missing;
    }

    fn draw(&mut self, world: &mut WorldCtx<'_>) {
        let dt = world.dt;
        let mut missing = self.draw_missing;
        self.call(ON_DRAW, dt, &mut missing);
        self.draw_missing = missing;
    }

    fn reload_before(&mut self) {
        // The engine is about to invalidate every handle; the missing-method
        // verdicts may change with the new assemblies.
        self.managed.detach();
        self.update_missing = false;
        self.draw_missing = false;
    }

    fn reload_after(&mut self) {
        self.bind();
    }

    fn destroy(&mut self) {
        let handle = self.managed.handle;
        self.managed.detach();
        self.scripts.borrow_mut().release(handle);
    }
}

/// Register a script-backed system under its class name's stable hash.
/// Idempotent per class, like native system registration.
pub fn add_script_system(
    systems: &mut SystemManager,
    scripts: &SharedScripts,
    class: &str,
) -> Result<(), ScriptError> {
    if !scripts.borrow().has_class(class) {
        return Err(ScriptError::UnknownClass(class.to_string()));
    }
    systems.add_boxed(
        stable_name_hash(class),
        class,
        Box::new(ScriptSystem::new(scripts.clone(), class)),
    );
    Ok(())
}

/// Reload step 2: drop every behavior's managed reference before handles
/// are invalidated.
pub fn invalidate_world(components: &mut ComponentManager) {
    for (_, behavior) in components.components_mut::<ScriptBehavior>() {
        behavior.managed.detach();
    }
}

/// Reload step 5: bind fresh instances for every behavior whose class
/// survived the reload. Classes that no longer resolve are muted until the
/// next reload.
pub fn rebind_world(scripts: &SharedScripts, components: &mut ComponentManager) {
    let mut scripts = scripts.borrow_mut();
    for (entity, behavior) in components.components_mut::<ScriptBehavior>() {
        let managed = &mut behavior.managed;
        if managed.class.is_empty() {
            continue;
        }
        match scripts.bind_instance(&managed.class) {
            Ok(handle) => {
                managed.handle = handle;
                managed.callbacks_enabled = true;
            }
            Err(e) => {
                warn!(%entity, class = %managed.class, error = %e, "behavior rebind failed");
                managed.callbacks_enabled = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{InstanceId, ManagedRuntime};
    use ember_ecs::{EntityManager, World};
    use std::collections::{HashMap, HashSet};

    type CallLog = Rc<RefCell<Vec<(u64, String)>>>;

    /// Scripted runtime fake: every loaded assembly is a class, method
    /// calls are recorded, and method sets are configurable per class.
    #[derive(Default)]
    struct StubRuntime {
        classes: HashSet<String>,
        methods: HashMap<String, Vec<&'static str>>,
        calls: CallLog,
        live: HashMap<u64, String>,
        next: u64,
    }

    impl ManagedRuntime for StubRuntime {
        fn load_assembly(&mut self, name: &str, _bytes: &[u8]) -> Result<(), ScriptError> {
            self.classes.insert(name.to_string());
            Ok(())
        }

        fn unload_all(&mut self) {
            self.classes.clear();
            self.live.clear();
        }

        fn has_class(&self, class: &str) -> bool {
            self.classes.contains(class)
        }

        fn create_instance(&mut self, class: &str) -> Result<InstanceId, ScriptError> {
            if !self.has_class(class) {
                return Err(ScriptError::UnknownClass(class.to_string()));
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
            let class = self.live.get(&instance.0).cloned().unwrap_or_default();
            let known = self
                .methods
                .get(&class)
                .map(|m| m.contains(&method))
                .unwrap_or(true);
            if !known {
                return Err(ScriptFault::MethodNotFound(method.to_string()));
            }
            self.calls.borrow_mut().push((instance.0, method.to_string()));
            Ok(ScriptValue::Unit)
        }
    }

    fn scripts_with(classes: &[(&str, Vec<&'static str>)]) -> (SharedScripts, CallLog) {
        let mut runtime = StubRuntime::default();
        for (class, methods) in classes {
            runtime.methods.insert(class.to_string(), methods.clone());
        }
        let calls = runtime.calls.clone();
        let mut engine = ScriptEngine::new(Box::new(runtime));
        for (class, _) in classes {
            engine.load_assembly_bytes(class, Vec::new()).unwrap();
        }
        (Rc::new(RefCell::new(engine)), calls)
    }

    fn call_count(calls: &CallLog, method: &str) -> usize {
        calls.borrow().iter().filter(|(_, m)| m == method).count()
    }

    #[test]
    fn behavior_binds_lazily_and_updates() {
        let (scripts, calls) = scripts_with(&[("Player", vec![ON_UPDATE])]);
        let mut world = World::new("main");
        let e = world.spawn();
        world
            .components
            .insert(e, ScriptBehavior::new("Player"))
            .unwrap();
        world
            .systems
            .add_with(|| ScriptBehaviorSystem::new(scripts.clone()));

        world.update(1.0 / 60.0);
        world.update(1.0 / 60.0);

        assert_eq!(call_count(&calls, ON_UPDATE), 2);
        let behavior = world.components.get::<ScriptBehavior>(e).unwrap();
        assert!(behavior.managed.is_bound());
        assert_eq!(scripts.borrow().live_handles(), 1);
    }

    #[test]
    fn missing_update_method_mutes_behavior() {
        let (scripts, calls) = scripts_with(&[("Decor", vec![])]);
        let mut world = World::new("main");
        let e = world.spawn();
        world
            .components
            .insert(e, ScriptBehavior::new("Decor"))
            .unwrap();
        world
            .systems
            .add_with(|| ScriptBehaviorSystem::new(scripts.clone()));

        world.update(0.016);
        world.update(0.016);

        assert_eq!(call_count(&calls, ON_UPDATE), 0);
        let behavior = world.components.get::<ScriptBehavior>(e).unwrap();
        assert!(!behavior.managed.callbacks_enabled);
    }

    #[test]
    fn unknown_class_mutes_instead_of_failing_the_frame() {
        let (scripts, _calls) = scripts_with(&[]);
        let mut world = World::new("main");
        let e = world.spawn();
        world
            .components
            .insert(e, ScriptBehavior::new("Ghost"))
            .unwrap();
        world
            .systems
            .add_with(|| ScriptBehaviorSystem::new(scripts.clone()));

        world.update(0.016);
        let behavior = world.components.get::<ScriptBehavior>(e).unwrap();
        assert!(!behavior.managed.callbacks_enabled);
        assert!(!behavior.managed.is_bound());
    }

    #[test]
    fn invalidate_then_rebind_restores_callbacks() {
        let (scripts, calls) = scripts_with(&[("Player", vec![ON_UPDATE])]);
        let mut world = World::new("main");
        let e = world.spawn();
        world
            .components
            .insert(e, ScriptBehavior::new("Player"))
            .unwrap();
        world
            .systems
            .add_with(|| ScriptBehaviorSystem::new(scripts.clone()));
        world.update(0.016);

        let old_handle = world.components.get::<ScriptBehavior>(e).unwrap().managed.handle;

        invalidate_world(&mut world.components);
        assert!(!world.components.get::<ScriptBehavior>(e).unwrap().managed.is_bound());

        struct NullFs;
        impl ember_core::Vfs for NullFs {
            fn read(&self, p: &std::path::Path) -> Result<Vec<u8>, ember_core::VfsError> {
                Err(ember_core::VfsError::NotFound(p.to_path_buf()))
            }
            fn write(&self, _: &std::path::Path, _: &[u8]) -> Result<(), ember_core::VfsError> {
                Ok(())
            }
            fn exists(&self, _: &std::path::Path) -> bool {
                false
            }
        }
        scripts.borrow_mut().reload_now(&NullFs);
        rebind_world(&scripts, &mut world.components);

        let behavior = world.components.get::<ScriptBehavior>(e).unwrap();
        assert!(behavior.managed.is_bound());
        assert!(behavior.managed.callbacks_enabled);
        assert_ne!(behavior.managed.handle, old_handle);

        world.update(0.016);
        assert_eq!(call_count(&calls, ON_UPDATE), 2);
    }

    #[test]
    fn script_system_lifecycle_binds_and_releases() {
        let (scripts, calls) = scripts_with(&[("Spawner", vec![ON_UPDATE, ON_DRAW])]);
        let mut systems = SystemManager::new();
        add_script_system(&mut systems, &scripts, "Spawner").unwrap();
        assert_eq!(scripts.borrow().live_handles(), 1);

        // Idempotent on the class hash.
        add_script_system(&mut systems, &scripts, "Spawner").unwrap();
        assert_eq!(systems.len(), 1);
        assert_eq!(scripts.borrow().live_handles(), 1);

        let mut entities = EntityManager::new();
        let mut components = ComponentManager::new();
        let mut ctx = WorldCtx {
            entities: &mut entities,
            components: &mut components,
            dt: 0.016,
        };
        systems.update(&mut ctx);
        systems.draw(&mut ctx);
        assert_eq!(call_count(&calls, ON_UPDATE), 1);
        assert_eq!(call_count(&calls, ON_DRAW), 1);

        systems.remove_by_hash(stable_name_hash("Spawner"));
        assert_eq!(scripts.borrow().live_handles(), 0);
    }

    #[test]
    fn add_script_system_rejects_unknown_class() {
        let (scripts, _calls) = scripts_with(&[]);
        let mut systems = SystemManager::new();
        let err = add_script_system(&mut systems, &scripts, "Nope").unwrap_err();
        assert!(matches!(err, ScriptError::UnknownClass(_)));
        assert!(systems.is_empty());
    }
}
