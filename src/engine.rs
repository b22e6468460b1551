//! The engine loop: world registry, global systems, script engine, and the
//! main-thread command queue, stepped once per frame.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use ember_core::{GameTime, MainThreadQueue, Vfs, WorldId};
use ember_ecs::{SystemManager, World, WorldRegistry};
use ember_scripting::{
    invalidate_world, rebind_world, ManagedRuntime, ScriptBehaviorSystem, ScriptEngine,
    ScriptError, SharedScripts,
};
use tracing::{debug, info};

use crate::descriptor::{SceneDescriptor, SceneError};
use crate::scene::SceneSystem;

/// Work posted to the simulation thread. Drained at the top of each frame,
/// in push order.
pub enum EngineCommand {
    /// Flag a scripting hot reload for the next frame boundary.
    RequestScriptReload,
    /// Make a world the only active scene.
    LoadScene(WorldId),
    /// Deactivate a scene.
    UnloadScene(WorldId),
    /// Arbitrary deferred work against the engine.
    Run(Box<dyn FnOnce(&mut Engine) + Send>),
}

/// Owns everything that lives for the duration of a session.
///
/// Simulation is single-threaded: systems, components, and the script
/// engine are touched only from the thread calling [`Engine::update`] and
/// [`Engine::draw`]. Other threads reach the engine exclusively through
/// the command queue.
pub struct Engine {
    time: GameTime,
    worlds: WorldRegistry,
    /// Engine-level state outside any scene: the global system set plus
    /// whatever entities and components those systems keep for themselves.
    globals: World,
    scripts: SharedScripts,
    queue: MainThreadQueue<EngineCommand>,
    vfs: Box<dyn Vfs>,
}

impl Engine {
    pub fn new(vfs: Box<dyn Vfs>, runtime: Box<dyn ManagedRuntime>) -> Self {
        let mut globals = World::new("globals");
        globals.systems.add::<SceneSystem>();
        info!("engine initialized");
        Self {
            time: GameTime::default(),
            worlds: WorldRegistry::new(),
            globals,
            scripts: Rc::new(RefCell::new(ScriptEngine::new(runtime))),
            queue: MainThreadQueue::new(),
            vfs,
        }
    }

    /// Engine backed by the in-tree rhai runtime.
    #[cfg(feature = "rhai")]
    pub fn with_rhai(vfs: Box<dyn Vfs>) -> Self {
        Self::new(vfs, Box::new(ember_scripting::RhaiRuntime::new()))
    }

    // ---- Accessors ----

    pub fn time(&self) -> &GameTime {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut GameTime {
        &mut self.time
    }

    pub fn scripts(&self) -> &SharedScripts {
        &self.scripts
    }

    pub fn global_systems(&mut self) -> &mut SystemManager {
        &mut self.globals.systems
    }

    /// A handle other threads can push commands through.
    pub fn command_queue(&self) -> MainThreadQueue<EngineCommand> {
        self.queue.clone()
    }

    pub fn get_world(&self, id: WorldId) -> Option<&World> {
        self.worlds.get_world(id)
    }

    pub fn get_world_mut(&mut self, id: WorldId) -> Option<&mut World> {
        self.worlds.get_world_mut(id)
    }

    // ---- Worlds and scenes ----

    /// Create an empty world with the script-behavior driver installed.
    pub fn create_world(&mut self, name: impl Into<String>) -> WorldId {
        let mut world = World::new(name);
        let scripts = self.scripts.clone();
        world
            .systems
            .add_with(|| ScriptBehaviorSystem::new(scripts));
        self.worlds.add(world)
    }

    /// Instantiate a scene descriptor into a registered world.
    pub fn instantiate_scene(&mut self, descriptor: &SceneDescriptor) -> Result<WorldId, SceneError> {
        let mut world = descriptor.instantiate()?;
        let scripts = self.scripts.clone();
        world
            .systems
            .add_with(|| ScriptBehaviorSystem::new(scripts));
        Ok(self.worlds.add(world))
    }

    /// Read, parse, and register a scene descriptor. The scene is not
    /// activated; call [`Engine::load_scene`] with the returned id.
    pub fn load_scene_file(&mut self, path: &Path) -> Result<WorldId, SceneError> {
        let bytes = self.vfs.read(path)?;
        let source = String::from_utf8_lossy(&bytes);
        let descriptor = SceneDescriptor::from_toml(&source)?;
        self.instantiate_scene(&descriptor)
    }

    /// Make a registered world the only active scene.
    pub fn load_scene(&mut self, id: WorldId) {
        if let Some(scenes) = self.globals.systems.get_mut::<SceneSystem>() {
            scenes.load_scene(id);
        }
    }

    /// Activate a scene without deactivating the others.
    pub fn push_scene(&mut self, id: WorldId) {
        if let Some(scenes) = self.globals.systems.get_mut::<SceneSystem>() {
            scenes.push_scene(id);
        }
    }

    /// Deactivate a scene. The world stays registered.
    pub fn unload_scene(&mut self, id: WorldId) {
        if let Some(scenes) = self.globals.systems.get_mut::<SceneSystem>() {
            scenes.unload_scene(id);
        }
    }

    /// Active scene ids, in activation order.
    pub fn active_scenes(&self) -> Vec<WorldId> {
        self.globals
            .systems
            .get::<SceneSystem>()
            .map(|s| s.active_scenes().to_vec())
            .unwrap_or_default()
    }

    /// Shut down and remove a world, deactivating it first.
    pub fn destroy_world(&mut self, id: WorldId) -> bool {
        self.unload_scene(id);
        self.worlds.remove(id)
    }

    // ---- Scripting ----

    /// Load a script assembly through the virtual file system.
    pub fn load_script(&mut self, path: &Path) -> Result<(), ScriptError> {
        self.scripts
            .borrow_mut()
            .load_assembly_path(self.vfs.as_ref(), path)
    }

    /// Load a script assembly from retained bytes.
    pub fn load_script_bytes(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), ScriptError> {
        self.scripts.borrow_mut().load_assembly_bytes(name, bytes)
    }

    /// Flag a scripting hot reload. Performed at the top of the next
    /// frame, never mid-callback.
    pub fn request_script_reload(&mut self) {
        self.scripts.borrow_mut().request_reload();
    }

    // ---- Frame loop ----

    /// Step one simulation frame: drain commands, perform any pending
    /// reload, advance time, run the global systems exactly once, then
    /// each active world's own systems.
    pub fn update(&mut self, raw_dt: f32) {
        for command in self.queue.drain() {
            self.apply(command);
        }

        if self.scripts.borrow().reload_pending() {
            self.perform_reload();
        }

        self.time.update(raw_dt);
        let dt = self.time.delta_time;

        // Global systems tick once per frame, active scenes or not.
        self.globals.update(dt);

        for id in self.active_scenes() {
            let Some(world) = self.worlds.get_world_mut(id) else {
                debug!(world = %id, "active scene has no registered world");
                continue;
            };
            world.update(dt);
        }
    }

    /// Run the draw phase: global systems once, then every active scene.
    pub fn draw(&mut self) {
        let dt = self.time.delta_time;
        self.globals.draw(dt);
        for id in self.active_scenes() {
            let Some(world) = self.worlds.get_world_mut(id) else {
                continue;
            };
            world.draw(dt);
        }
    }

    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::RequestScriptReload => self.request_script_reload(),
            EngineCommand::LoadScene(id) => self.load_scene(id),
            EngineCommand::UnloadScene(id) => self.unload_scene(id),
            EngineCommand::Run(f) => f(self),
        }
    }

    /// The hot-reload protocol. Native entity and component state is
    /// untouched throughout; only the managed side is rebuilt.
    fn perform_reload(&mut self) {
        info!("performing scripting hot reload");

        // 1. Warn every system so cached managed state is dropped.
        self.globals.systems.for_each_mut(|s| s.reload_before());
        for world in self.worlds.iter_mut() {
            world.systems.for_each_mut(|s| s.reload_before());
        }

        // 2. Detach every script-backed component.
        invalidate_world(&mut self.globals.components);
        for world in self.worlds.iter_mut() {
            invalidate_world(&mut world.components);
        }

        // 3-4. Invalidate handles, tear down the runtime, replay assemblies.
        self.scripts.borrow_mut().reload_now(self.vfs.as_ref());

        // 5. Bind fresh instances for surviving classes.
        rebind_world(&self.scripts, &mut self.globals.components);
        for world in self.worlds.iter_mut() {
            rebind_world(&self.scripts, &mut world.components);
        }

        // 6. Resume managed callbacks.
        self.globals.systems.for_each_mut(|s| s.reload_after());
        for world in self.worlds.iter_mut() {
            world.systems.for_each_mut(|s| s.reload_after());
        }
    }

    /// Tear down every world and system.
    pub fn shutdown(&mut self) {
        info!("engine shutdown");
        let ids: Vec<WorldId> = self.worlds.ids().collect();
        for id in ids {
            self.destroy_world(id);
        }
        self.globals.shutdown();
    }
}
