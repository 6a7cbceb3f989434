//! Integer chunk coordinates on the infinite terrain grid.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifies one grid cell. Chunk `(x, y)` is centred at
/// `(x, y) * cell_size` in the world XZ plane.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell whose centre is nearest to `world`.
    ///
    /// Rounds half away from zero on each axis.
    pub fn containing(world: Vec2, cell_size: f32) -> Self {
        Self {
            x: (world.x / cell_size).round() as i32,
            y: (world.y / cell_size).round() as i32,
        }
    }

    /// Returns the coordinate shifted by `(dx, dy)` cells, or `None` if
    /// that leaves the `i32` range.
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    /// World-space centre of this cell.
    pub fn world_center(self, cell_size: f32) -> Vec2 {
        self.as_vec2() * cell_size
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// Iterates the square window of cells within `radius` of `self`,
    /// row by row (y outer, x inner). Cells outside the `i32` range are
    /// skipped, so the window is clipped at the edge of the grid.
    pub fn window(self, radius: i32) -> impl Iterator<Item = ChunkCoord> {
        (-radius..=radius).flat_map(move |dy| {
            (-radius..=radius).filter_map(move |dx| self.checked_offset(dx, dy))
        })
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}
