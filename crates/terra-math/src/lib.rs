//! Planar math for the terrain grid: chunk coordinates and world-space bounds.

mod bounds;
mod coord;

pub use bounds::Bounds2;
pub use coord::ChunkCoord;

pub use glam::Vec2;
