//! Procedural height fields: multi-octave noise sampling and per-chunk height map generation.

mod generator;
mod sampler;

pub use generator::{HeightMap, HeightMapError, HeightMapSettings, generate_height_map};
pub use sampler::{HeightmapSampler, NoiseSettings};
