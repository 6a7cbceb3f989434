//! Chunk mesh dimensions.

use serde::{Deserialize, Serialize};

use crate::terrain_mesh::{MeshError, lod_skip_increment};

/// Number of mesh LODs every supported chunk size can be built at.
pub const NUM_SUPPORTED_LODS: u32 = 5;

/// Chunk sizes (in cells) divisible by every LOD skip increment
/// (1, 2, 4, 6 and 8).
pub const SUPPORTED_CHUNK_SIZES: [u32; 9] = [48, 72, 96, 120, 144, 168, 192, 216, 240];

/// Resolution and world scale of terrain chunk meshes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// World units per height sample.
    pub mesh_scale: f32,
    /// Index into [`SUPPORTED_CHUNK_SIZES`].
    pub chunk_size_index: usize,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_scale: 1.0,
            chunk_size_index: SUPPORTED_CHUNK_SIZES.len() - 1,
        }
    }
}

impl MeshSettings {
    /// Cells along one side of the chunk at LOD 0.
    ///
    /// Out-of-range indices clamp to the largest size; [`Self::validate`]
    /// reports them.
    pub fn chunk_size(&self) -> u32 {
        let index = self.chunk_size_index.min(SUPPORTED_CHUNK_SIZES.len() - 1);
        SUPPORTED_CHUNK_SIZES[index]
    }

    /// Height samples per side, including a one-sample border ring used
    /// only for normals.
    pub fn num_verts_per_line(&self) -> usize {
        self.chunk_size() as usize + 3
    }

    /// Side length of one chunk in world units.
    pub fn mesh_world_size(&self) -> f32 {
        self.chunk_size() as f32 * self.mesh_scale
    }

    /// Whether meshes can be built at `lod` with these settings.
    pub fn supports_lod(&self, lod: u32) -> bool {
        lod < NUM_SUPPORTED_LODS && self.chunk_size() % lod_skip_increment(lod) == 0
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.chunk_size_index >= SUPPORTED_CHUNK_SIZES.len() {
            return Err(MeshError::UnsupportedChunkSizeIndex(self.chunk_size_index));
        }
        if !(self.mesh_scale > 0.0) {
            return Err(MeshError::InvalidScale(self.mesh_scale));
        }
        Ok(())
    }
}
