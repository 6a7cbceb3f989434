//! Height-map-to-mesh generation with LOD vertex skipping.

use glam::Vec3;
use terra_heightmap::HeightMap;

use crate::mesh_data::MeshData;
use crate::settings::{MeshSettings, NUM_SUPPORTED_LODS};

/// Errors produced when building a terrain mesh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("LOD {lod} is not supported for chunk size {chunk_size}")]
    UnsupportedLod { lod: u32, chunk_size: u32 },

    #[error("height map is {width}x{height}, expected {expected}x{expected}")]
    HeightMapSizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
    },

    #[error("chunk size index {0} is out of range")]
    UnsupportedChunkSizeIndex(usize),

    #[error("mesh scale must be positive, got {0}")]
    InvalidScale(f32),
}

/// Stride between emitted samples at `lod`: 1 for full detail, then 2, 4, 6, 8.
pub fn lod_skip_increment(lod: u32) -> u32 {
    if lod == 0 { 1 } else { lod * 2 }
}

/// Builds the mesh for one chunk at `lod`.
///
/// The height map must be `num_verts_per_line` samples square. Its outer
/// ring is read for normals only; the interior is emitted every
/// `lod_skip_increment(lod)` samples, so coarser LODs share their edge
/// vertices with finer ones.
pub fn generate_terrain_mesh(
    height_map: &HeightMap,
    settings: &MeshSettings,
    lod: u32,
) -> Result<MeshData, MeshError> {
    settings.validate()?;
    if lod >= NUM_SUPPORTED_LODS || !settings.supports_lod(lod) {
        return Err(MeshError::UnsupportedLod {
            lod,
            chunk_size: settings.chunk_size(),
        });
    }
    let n = settings.num_verts_per_line();
    if height_map.width() != n || height_map.height() != n {
        return Err(MeshError::HeightMapSizeMismatch {
            width: height_map.width(),
            height: height_map.height(),
            expected: n,
        });
    }

    let skip = lod_skip_increment(lod) as usize;
    let cells = n - 3;
    let verts_per_line = cells / skip + 1;
    let world_size = settings.mesh_world_size();
    let scale = settings.mesh_scale;

    let mut mesh = MeshData::new(lod);
    mesh.positions.reserve(verts_per_line * verts_per_line);
    mesh.normals.reserve(verts_per_line * verts_per_line);
    mesh.uvs.reserve(verts_per_line * verts_per_line);
    mesh.indices
        .reserve((verts_per_line - 1) * (verts_per_line - 1) * 6);

    for row in 0..verts_per_line {
        let y = 1 + row * skip;
        for col in 0..verts_per_line {
            let x = 1 + col * skip;
            let percent_x = (x - 1) as f32 / cells as f32;
            let percent_y = (y - 1) as f32 / cells as f32;
            let h = height_map.get(x, y);

            // Grid rows run toward -Z from the top-left corner.
            mesh.positions.push([
                (percent_x - 0.5) * world_size,
                h,
                (0.5 - percent_y) * world_size,
            ]);
            mesh.uvs.push([percent_x, percent_y]);

            let dh_dx = (height_map.get(x + 1, y) - height_map.get(x - 1, y)) / (2.0 * scale);
            let dh_dz = (height_map.get(x, y - 1) - height_map.get(x, y + 1)) / (2.0 * scale);
            let normal = Vec3::new(-dh_dx, 1.0, -dh_dz).normalize();
            mesh.normals.push(normal.to_array());
        }
    }

    // Clockwise when viewed from above (+Y).
    let line = verts_per_line as u32;
    for row in 0..line - 1 {
        for col in 0..line - 1 {
            let a = row * line + col;
            let b = a + 1;
            let c = a + line;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, d, c, d, a, b]);
        }
    }

    Ok(mesh)
}
