//! Render components and the frame-submission system.
//!
//! The engine core does not own a GPU device; it culls the scene down to a
//! camera view plus a draw list and hands both to a [`RenderBackend`]. The
//! in-tree [`NullBackend`] discards everything, which keeps headless runs
//! and tests on the same code path.

use ember_core::{Color, Transform, Uid};
use ember_ecs::{System, WorldCtx};
use glam::Mat4;
use tracing::trace;

/// Perspective camera component. The first enabled camera in component
/// order wins; without one the frame is skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub active: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y_deg: 60.0,
            near: 0.1,
            far: 1000.0,
            active: true,
        }
    }
}

/// A mesh reference plus per-instance draw state.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRenderer {
    pub mesh: Uid,
    pub tint: Color,
    pub visible: bool,
}

impl Default for MeshRenderer {
    fn default() -> Self {
        Self {
            mesh: Uid::INVALID,
            tint: Color::WHITE,
            visible: true,
        }
    }
}

/// The resolved camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub projection: Mat4,
}

/// One submitted draw.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDraw {
    pub mesh: Uid,
    pub transform: Mat4,
    pub tint: Color,
}

/// Consumes a culled frame. Implemented by the real renderer out of tree.
pub trait RenderBackend {
    fn submit(&mut self, view: &CameraView, draws: &[MeshDraw]);
}

/// Backend that drops every frame.
#[derive(Default)]
pub struct NullBackend;

impl RenderBackend for NullBackend {
    fn submit(&mut self, _view: &CameraView, _draws: &[MeshDraw]) {}
}

/// Walks the world during the draw phase and submits visible mesh
/// renderers under the first active camera.
pub struct RenderSystem {
    backend: Box<dyn RenderBackend>,
    aspect: f32,
    frames_submitted: u64,
}

impl RenderSystem {
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self {
            backend,
            aspect: 16.0 / 9.0,
            frames_submitted: 0,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    fn resolve_camera(&self, world: &WorldCtx<'_>) -> Option<CameraView> {
        for (entity, camera) in world.components.components::<Camera>() {
            if !camera.active {
                continue;
            }
            let Some(transform) = world.components.get::<Transform>(entity) else {
                continue;
            };
            return Some(CameraView {
                view: transform.matrix().inverse(),
                projection: Mat4::perspective_rh(
                    camera.fov_y_deg.to_radians(),
                    self.aspect,
                    camera.near,
                    camera.far,
                ),
            });
        }
        None
    }
}

impl Default for RenderSystem {
    fn default() -> Self {
        Self::new(Box::new(NullBackend))
    }
}

impl System for RenderSystem {
    fn draw(&mut self, world: &mut WorldCtx<'_>) {
        let Some(view) = self.resolve_camera(world) else {
            return;
        };

        let mut draws = Vec::new();
        for (entity, renderer) in world.components.components::<MeshRenderer>() {
            if !renderer.visible || renderer.mesh == Uid::INVALID {
                continue;
            }
            let Some(transform) = world.components.get::<Transform>(entity) else {
                continue;
            };
            draws.push(MeshDraw {
                mesh: renderer.mesh,
                transform: transform.matrix(),
                tint: renderer.tint,
            });
        }

        trace!(draws = draws.len(), "frame submitted");
        self.backend.submit(&view, &draws);
        self.frames_submitted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_ecs::World;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct CountingBackend {
        frames: Rc<RefCell<Vec<usize>>>,
    }

    impl RenderBackend for CountingBackend {
        fn submit(&mut self, _view: &CameraView, draws: &[MeshDraw]) {
            self.frames.borrow_mut().push(draws.len());
        }
    }

    fn world_with_camera() -> World {
        let mut world = World::new("render-test");
        let cam = world.spawn();
        world.components.add::<Camera>(cam).unwrap();
        world.components.add::<Transform>(cam).unwrap();
        world
    }

    fn add_mesh(world: &mut World, visible: bool) {
        let e = world.spawn();
        world.components.add::<Transform>(e).unwrap();
        let renderer = world.components.add::<MeshRenderer>(e).unwrap();
        renderer.mesh = Uid::generate();
        renderer.visible = visible;
    }

    #[test]
    fn no_camera_skips_the_frame() {
        let mut world = World::new("render-test");
        add_mesh(&mut world, true);
        let backend = CountingBackend::default();
        let frames = backend.frames.clone();
        world
            .systems
            .add_with(|| RenderSystem::new(Box::new(backend)));

        world.draw(0.016);
        assert!(frames.borrow().is_empty());
    }

    #[test]
    fn only_visible_renderers_are_submitted() {
        let mut world = world_with_camera();
        add_mesh(&mut world, true);
        add_mesh(&mut world, true);
        add_mesh(&mut world, false);

        let backend = CountingBackend::default();
        let frames = backend.frames.clone();
        world
            .systems
            .add_with(|| RenderSystem::new(Box::new(backend)));

        world.draw(0.016);
        assert_eq!(*frames.borrow(), vec![2]);
        assert_eq!(
            world
                .systems
                .get::<RenderSystem>()
                .map(|r| r.frames_submitted()),
            Some(1)
        );
    }

    #[test]
    fn inactive_camera_is_passed_over() {
        let mut world = world_with_camera();
        for (_, camera) in world.components.components_mut::<Camera>() {
            camera.active = false;
        }
        add_mesh(&mut world, true);

        let backend = CountingBackend::default();
        let frames = backend.frames.clone();
        world
            .systems
            .add_with(|| RenderSystem::new(Box::new(backend)));

        world.draw(0.016);
        assert!(frames.borrow().is_empty());
    }

    #[test]
    fn default_mesh_id_is_never_drawn() {
        let mut world = world_with_camera();
        let e = world.spawn();
        world.components.add::<Transform>(e).unwrap();
        world.components.add::<MeshRenderer>(e).unwrap();

        let backend = CountingBackend::default();
        let frames = backend.frames.clone();
        world
            .systems
            .add_with(|| RenderSystem::new(Box::new(backend)));

        world.draw(0.016);
        assert_eq!(*frames.borrow(), vec![0]);
    }
}
