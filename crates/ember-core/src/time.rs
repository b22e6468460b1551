//! Frame time tracking for the engine loop.

use serde::{Deserialize, Serialize};

/// Configuration for frame time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// How many engine seconds pass per real second.
    pub time_scale: f32,
    /// Maximum delta time to prevent spiral of death.
    pub max_delta_time: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            max_delta_time: 0.25,
        }
    }
}

/// Frame time tracking.
#[derive(Debug, Clone)]
pub struct GameTime {
    /// Configuration
    pub config: TimeConfig,
    /// Time since engine start in seconds
    pub total_time: f64,
    /// Delta time for this frame (clamped, scaled)
    pub delta_time: f32,
    /// Unscaled delta time
    pub unscaled_delta_time: f32,
    /// Frame counter
    pub frame_count: u64,
    /// Whether updates are paused (delta reported as zero)
    pub paused: bool,
}

impl Default for GameTime {
    fn default() -> Self {
        Self {
            config: TimeConfig::default(),
            total_time: 0.0,
            delta_time: 0.0,
            unscaled_delta_time: 0.0,
            frame_count: 0,
            paused: false,
        }
    }
}

impl GameTime {
    /// Create a new game time with custom config.
    pub fn new(config: TimeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Update with the raw delta from the previous frame.
    pub fn update(&mut self, raw_delta: f32) {
        self.unscaled_delta_time = raw_delta.min(self.config.max_delta_time);
        self.frame_count += 1;

        if self.paused {
            self.delta_time = 0.0;
            return;
        }

        self.delta_time = self.unscaled_delta_time * self.config.time_scale;
        self.total_time += self.delta_time as f64;
    }

    /// Pause time advancement.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume time advancement.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Set the time scale (0.0 = frozen, 1.0 = normal).
    pub fn set_time_scale(&mut self, scale: f32) {
        self.config.time_scale = scale.max(0.0);
    }
}
