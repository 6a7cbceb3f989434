//! Render and collider sink: where chunk visuals end up.
//!
//! The grid never owns engine objects. Each chunk holds the [`ChunkHandle`]
//! its sink returned at spawn time and pushes visibility, render meshes and
//! collider meshes through it.

use std::sync::Arc;

use glam::Vec2;
use terra_math::ChunkCoord;
use terra_mesh::MeshData;
use tracing::warn;

/// Opaque handle to a chunk's visual object inside a sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkHandle(pub u32);

/// Opaque material identifier, interpreted only by the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Write-only destination for chunk visuals and colliders.
pub trait TerrainSink {
    /// Create the visual object for a chunk centred at `position` (world XZ).
    fn spawn_chunk(&mut self, coord: ChunkCoord, position: Vec2, material: MaterialId)
    -> ChunkHandle;

    fn set_visible(&mut self, handle: ChunkHandle, visible: bool);

    /// Replace the mesh rendered for the chunk.
    fn set_render_mesh(&mut self, handle: ChunkHandle, mesh: Arc<MeshData>);

    /// Assign the chunk's collision mesh.
    fn set_collider_mesh(&mut self, handle: ChunkHandle, mesh: Arc<MeshData>);
}

/// State of one chunk object inside a [`RecordingSink`].
#[derive(Clone, Debug)]
pub struct SinkObject {
    pub coord: ChunkCoord,
    pub position: Vec2,
    pub material: MaterialId,
    pub visible: bool,
    pub render_mesh: Option<Arc<MeshData>>,
    pub collider_mesh: Option<Arc<MeshData>>,
    /// Number of times the render mesh was replaced.
    pub render_mesh_swaps: u32,
    /// Number of times a collider mesh was assigned.
    pub collider_assignments: u32,
}

/// In-memory sink that records what it was told.
#[derive(Debug, Default)]
pub struct RecordingSink {
    objects: Vec<SinkObject>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: ChunkHandle) -> Option<&SinkObject> {
        self.objects.get(handle.0 as usize)
    }

    pub fn objects(&self) -> &[SinkObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn visible_count(&self) -> usize {
        self.objects.iter().filter(|o| o.visible).count()
    }

    pub fn collider_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.collider_mesh.is_some())
            .count()
    }

    fn object_mut(&mut self, handle: ChunkHandle) -> Option<&mut SinkObject> {
        let object = self.objects.get_mut(handle.0 as usize);
        if object.is_none() {
            warn!(?handle, "Sink received unknown chunk handle");
        }
        object
    }
}

impl TerrainSink for RecordingSink {
    fn spawn_chunk(
        &mut self,
        coord: ChunkCoord,
        position: Vec2,
        material: MaterialId,
    ) -> ChunkHandle {
        let handle = ChunkHandle(self.objects.len() as u32);
        self.objects.push(SinkObject {
            coord,
            position,
            material,
            visible: false,
            render_mesh: None,
            collider_mesh: None,
            render_mesh_swaps: 0,
            collider_assignments: 0,
        });
        handle
    }

    fn set_visible(&mut self, handle: ChunkHandle, visible: bool) {
        if let Some(object) = self.object_mut(handle) {
            object.visible = visible;
        }
    }

    fn set_render_mesh(&mut self, handle: ChunkHandle, mesh: Arc<MeshData>) {
        if let Some(object) = self.object_mut(handle) {
            object.render_mesh = Some(mesh);
            object.render_mesh_swaps += 1;
        }
    }

    fn set_collider_mesh(&mut self, handle: ChunkHandle, mesh: Arc<MeshData>) {
        if let Some(object) = self.object_mut(handle) {
            object.collider_mesh = Some(mesh);
            object.collider_assignments += 1;
        }
    }
}
