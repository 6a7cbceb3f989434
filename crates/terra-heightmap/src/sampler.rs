//! Multi-octave fractal Brownian motion (fBm) noise sampler.
//!
//! Composites several octaves of simplex noise so the terrain has features
//! at many spatial frequencies.

use noise::{NoiseFn, Simplex};
use serde::{Deserialize, Serialize};

/// Noise parameters for height map generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// World seed for deterministic generation.
    pub seed: u32,
    /// World units per noise period of the first octave. Larger values give
    /// broader hills.
    pub scale: f64,
    /// Number of octaves to composite.
    pub octaves: u32,
    /// Amplitude multiplier between successive octaves, in `[0, 1]`.
    pub persistence: f64,
    /// Frequency multiplier between successive octaves, `>= 1`.
    pub lacunarity: f64,
    /// Constant shift of the sampling origin.
    pub offset: [f64; 2],
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 50.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: [0.0, 0.0],
        }
    }
}

/// Samples fBm over simplex noise.
pub struct HeightmapSampler {
    noise: Simplex,
    settings: NoiseSettings,
}

impl HeightmapSampler {
    pub fn new(settings: NoiseSettings) -> Self {
        let noise = Simplex::new(settings.seed);
        Self { noise, settings }
    }

    /// Raw fBm value at a 2D sample position.
    ///
    /// The theoretical range is `[-max_amplitude, +max_amplitude]`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x = x + self.settings.offset[0];
        let y = y - self.settings.offset[1];

        let mut total = 0.0;
        let mut frequency = 1.0 / self.settings.scale;
        let mut amplitude = 1.0;

        for _ in 0..self.settings.octaves {
            total += self.noise.get([x * frequency, y * frequency]) * amplitude;
            frequency *= self.settings.lacunarity;
            amplitude *= self.settings.persistence;
        }

        total
    }

    /// Geometric sum of all octave amplitudes.
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = 1.0;
        for _ in 0..self.settings.octaves {
            sum += amp;
            amp *= self.settings.persistence;
        }
        sum
    }

    /// `sample` mapped into `[0, 1]`.
    pub fn sample_normalized(&self, x: f64, y: f64) -> f64 {
        let max = self.max_amplitude();
        if max <= 0.0 {
            return 0.5;
        }
        ((self.sample(x, y) / max + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    pub fn settings(&self) -> &NoiseSettings {
        &self.settings
    }
}
