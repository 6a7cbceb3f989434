//! Terrain meshing: mesh settings, mesh data, and height-map-to-mesh generation per level of detail.

pub mod mesh_data;
pub mod settings;
pub mod terrain_mesh;

pub use mesh_data::MeshData;
pub use settings::{MeshSettings, NUM_SUPPORTED_LODS, SUPPORTED_CHUNK_SIZES};
pub use terrain_mesh::{MeshError, generate_terrain_mesh, lod_skip_increment};
