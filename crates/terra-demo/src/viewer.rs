//! Scripted viewer motion.

use glam::Vec2;
use terra_config::ViewerConfig;

/// Straight-line viewer path across the terrain plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerPath {
    pub start: Vec2,
    /// World units per second.
    pub velocity: Vec2,
}

impl ViewerPath {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            start: Vec2::from(config.start),
            velocity: Vec2::from(config.velocity),
        }
    }

    pub fn position_at(&self, sim_time: f64) -> Vec2 {
        self.start + self.velocity * sim_time as f32
    }
}
