//! Audio components and playback dispatch.
//!
//! Playback itself happens behind [`AudioSink`]; the system only turns
//! play requests into positioned sink calls, so the engine core never
//! links an audio device.

use ember_core::Transform;
use ember_ecs::{System, WorldCtx};
use glam::Vec3;
use tracing::trace;

/// A positional sound emitter. Setting `play_requested` queues one
/// playback; the [`AudioSystem`] clears the flag when it dispatches.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub clip: String,
    pub volume: f32,
    pub looped: bool,
    pub play_requested: bool,
}

impl Default for AudioSource {
    fn default() -> Self {
        Self {
            clip: String::new(),
            volume: 1.0,
            looped: false,
            play_requested: false,
        }
    }
}

impl AudioSource {
    pub fn new(clip: impl Into<String>) -> Self {
        Self {
            clip: clip.into(),
            ..Default::default()
        }
    }

    /// Queue one playback of this source's clip.
    pub fn play(&mut self) {
        self.play_requested = true;
    }
}

/// Consumes positioned playback requests. Implemented by the real audio
/// device out of tree.
pub trait AudioSink {
    fn play(&mut self, clip: &str, volume: f32, looped: bool, position: Vec3);
}

/// Sink that swallows every request.
#[derive(Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&mut self, _clip: &str, _volume: f32, _looped: bool, _position: Vec3) {}
}

/// Dispatches pending [`AudioSource`] requests to the sink, positioned at
/// the owning entity's transform (origin when untransformed).
pub struct AudioSystem {
    sink: Box<dyn AudioSink>,
}

impl AudioSystem {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self { sink }
    }
}

impl Default for AudioSystem {
    fn default() -> Self {
        Self::new(Box::new(NullSink))
    }
}

impl System for AudioSystem {
    fn update(&mut self, world: &mut WorldCtx<'_>) {
        // Collect first: dispatch needs immutable Transform lookups on the
        // same component manager.
        let mut pending = Vec::new();
        for (entity, source) in world.components.components_mut::<AudioSource>() {
            if !source.play_requested || source.clip.is_empty() {
                continue;
            }
            source.play_requested = false;
            pending.push((entity, source.clip.clone(), source.volume, source.looped));
        }

        for (entity, clip, volume, looped) in pending {
            let position = world
                .components
                .get::<Transform>(entity)
                .map(|t| t.position)
                .unwrap_or(Vec3::ZERO);
            trace!(%entity, clip = %clip, "audio playback dispatched");
            self.sink.play(&clip, volume, looped, position);
        }
    }
}
