//! Mesh output of a terrain meshing pass.

/// Vertices and triangle indices for one chunk at one level of detail.
///
/// Positions are chunk-local, centred on the chunk origin, in world units.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list, 3 indices per triangle.
    pub indices: Vec<u32>,
    /// Level of detail this mesh was built at.
    pub lod: u32,
}

impl MeshData {
    pub fn new(lod: u32) -> Self {
        Self {
            lod,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
