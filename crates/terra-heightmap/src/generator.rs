//! Per-chunk height map generation.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sampler::{HeightmapSampler, NoiseSettings};

/// Shape of the generated terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapSettings {
    pub noise: NoiseSettings,
    /// World height of a fully raised sample.
    pub height_multiplier: f32,
    /// Exponent applied to normalized noise before scaling. Values above 1
    /// flatten lowlands and sharpen peaks.
    pub height_exponent: f32,
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            height_multiplier: 40.0,
            height_exponent: 2.0,
        }
    }
}

impl HeightMapSettings {
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.curve(0.0)
    }

    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.curve(1.0)
    }

    fn curve(&self, t: f32) -> f32 {
        t.powf(self.height_exponent)
    }

    pub fn validate(&self) -> Result<(), HeightMapError> {
        if !(self.noise.scale > 0.0) {
            return Err(HeightMapError::InvalidSetting {
                name: "noise.scale",
                value: self.noise.scale,
            });
        }
        if !(0.0..=1.0).contains(&self.noise.persistence) {
            return Err(HeightMapError::InvalidSetting {
                name: "noise.persistence",
                value: self.noise.persistence,
            });
        }
        if !(self.noise.lacunarity >= 1.0) {
            return Err(HeightMapError::InvalidSetting {
                name: "noise.lacunarity",
                value: self.noise.lacunarity,
            });
        }
        if !(self.height_exponent > 0.0) {
            return Err(HeightMapError::InvalidSetting {
                name: "height_exponent",
                value: f64::from(self.height_exponent),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HeightMapError {
    #[error("height map dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: usize, height: usize },

    #[error("invalid height map setting {name} = {value}")]
    InvalidSetting { name: &'static str, value: f64 },
}

/// Row-major grid of height samples for one chunk. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    values: Vec<f32>,
    width: usize,
    height: usize,
    min_value: f32,
    max_value: f32,
    sample_center: Vec2,
}

impl HeightMap {
    /// Wraps precomputed samples. `values.len()` must equal `width * height`.
    pub fn from_values(
        width: usize,
        height: usize,
        values: Vec<f32>,
        sample_center: Vec2,
    ) -> Result<Self, HeightMapError> {
        if width == 0 || height == 0 || values.len() != width * height {
            return Err(HeightMapError::EmptyDimensions { width, height });
        }
        let (min_value, max_value) = values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Ok(Self {
            values,
            width,
            height,
            min_value,
            max_value,
            sample_center,
        })
    }

    /// A height map with every sample at `value`.
    pub fn flat(width: usize, height: usize, value: f32) -> Self {
        Self {
            values: vec![value; width * height],
            width,
            height,
            min_value: value,
            max_value: value,
            sample_center: Vec2::ZERO,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn sample_center(&self) -> Vec2 {
        self.sample_center
    }
}

/// Generates a `width × height` height map centred on `sample_center`.
///
/// Sample `(x, y)` reads noise at `(x - w/2 + cx, y - h/2 - cy)`; the y axis
/// is flipped so that grid rows run toward -Z, matching the mesh layout.
/// Neighbouring chunks therefore agree on their shared edge.
pub fn generate_height_map(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    sample_center: Vec2,
) -> Result<HeightMap, HeightMapError> {
    if width == 0 || height == 0 {
        return Err(HeightMapError::EmptyDimensions { width, height });
    }
    settings.validate()?;

    let sampler = HeightmapSampler::new(settings.noise.clone());
    let half_width = width as f64 / 2.0;
    let half_height = height as f64 / 2.0;
    let cx = f64::from(sample_center.x);
    let cy = f64::from(sample_center.y);

    let mut values = Vec::with_capacity(width * height);
    let mut min_value = f32::MAX;
    let mut max_value = f32::MIN;

    for y in 0..height {
        for x in 0..width {
            let sx = x as f64 - half_width + cx;
            let sy = y as f64 - half_height - cy;
            let normalized = sampler.sample_normalized(sx, sy) as f32;
            let h = settings.curve(normalized) * settings.height_multiplier;
            min_value = min_value.min(h);
            max_value = max_value.max(h);
            values.push(h);
        }
    }

    Ok(HeightMap {
        values,
        width,
        height,
        min_value,
        max_value,
        sample_center,
    })
}
