//! Streaming configuration errors.

use terra_heightmap::HeightMapError;
use terra_lod::LodError;
use terra_mesh::MeshError;

/// Errors reported when building a [`crate::TerrainGrid`] from invalid settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    #[error("invalid LOD table: {0}")]
    Lod(#[from] LodError),

    #[error("invalid mesh settings: {0}")]
    Mesh(#[from] MeshError),

    #[error("invalid height map settings: {0}")]
    HeightMap(#[from] HeightMapError),

    #[error("collider LOD index {index} is out of range for {levels} detail levels")]
    ColliderLodOutOfRange { index: usize, levels: usize },

    #[error("detail level {index} uses LOD {lod}, which chunk size {chunk_size} does not support")]
    UnsupportedLod {
        index: usize,
        lod: u32,
        chunk_size: u32,
    },

    #[error(
        "view distance {view_distance} spans more than {max_radius} chunks of size {chunk_world_size}"
    )]
    ViewRadiusTooLarge {
        view_distance: f32,
        chunk_world_size: f32,
        max_radius: i32,
    },

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidThreshold { name: &'static str, value: f32 },
}
