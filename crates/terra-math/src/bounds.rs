use glam::Vec2;

/// Axis-aligned square in the world XZ plane.
///
/// Invariant: `half_extent` is non-negative on both axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds2 {
    pub center: Vec2,
    pub half_extent: Vec2,
}

impl Bounds2 {
    /// Create bounds from a center point and full size. Negative sizes are
    /// folded to their absolute value.
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            half_extent: size.abs() * 0.5,
        }
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.half_extent
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half_extent
    }

    pub fn size(&self) -> Vec2 {
        self.half_extent * 2.0
    }

    /// Returns the closest point inside the bounds to `p`.
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min(), self.max())
    }

    /// Squared distance from `p` to the nearest edge. Zero when `p` is inside.
    pub fn sqr_distance(&self, p: Vec2) -> f32 {
        (p - self.closest_point(p)).length_squared()
    }

    /// Distance from `p` to the nearest edge. Zero when `p` is inside.
    pub fn distance(&self, p: Vec2) -> f32 {
        self.sqr_distance(p).sqrt()
    }
}
