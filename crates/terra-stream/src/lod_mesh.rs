//! Per-chunk, per-LOD mesh cache entry.

use std::sync::Arc;

use terra_heightmap::HeightMap;
use terra_mesh::{MeshData, MeshSettings};
use tracing::trace;

use crate::jobs::{JobDispatcher, JobError, JobTicket, mesh_producer};

/// Outcome of [`LodMeshSlot::request_mesh`].
#[derive(Clone, Debug)]
pub enum MeshRequest {
    /// The mesh was already generated; no job was submitted.
    Cached(Arc<MeshData>),
    /// A generation job was submitted.
    Submitted,
    /// A job is already outstanding; nothing was submitted.
    Pending,
}

/// Gates mesh generation for one chunk at one level of detail and caches
/// the result.
///
/// `requested` is set when a job is submitted and cleared only if that job
/// fails, so a slot has at most one outstanding job and, once its mesh
/// arrives, never submits again.
#[derive(Debug)]
pub struct LodMeshSlot {
    lod: u32,
    mesh: Option<Arc<MeshData>>,
    requested: bool,
    requests_issued: u32,
}

impl LodMeshSlot {
    pub fn new(lod: u32) -> Self {
        Self {
            lod,
            mesh: None,
            requested: false,
            requests_issued: 0,
        }
    }

    pub fn lod(&self) -> u32 {
        self.lod
    }

    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        self.mesh.as_ref()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn has_requested_mesh(&self) -> bool {
        self.requested
    }

    /// Jobs submitted over the slot's lifetime, including failed ones.
    pub fn requests_issued(&self) -> u32 {
        self.requests_issued
    }

    /// Submits a job building this slot's mesh from `height_map`, unless the
    /// mesh is cached or a job is already outstanding.
    pub fn request_mesh(
        &mut self,
        ticket: JobTicket,
        height_map: &Arc<HeightMap>,
        settings: &MeshSettings,
        jobs: &dyn JobDispatcher,
    ) -> Result<MeshRequest, JobError> {
        if let Some(mesh) = &self.mesh {
            return Ok(MeshRequest::Cached(Arc::clone(mesh)));
        }
        if self.requested {
            return Ok(MeshRequest::Pending);
        }

        self.requested = true;
        let producer = mesh_producer(Arc::clone(height_map), settings.clone(), self.lod);
        if let Err(err) = jobs.submit(ticket, producer) {
            self.requested = false;
            return Err(err);
        }
        self.requests_issued += 1;
        trace!(coord = %ticket.coord, lod = self.lod, "Requested LOD mesh");
        Ok(MeshRequest::Submitted)
    }

    pub fn on_mesh_received(&mut self, mesh: Arc<MeshData>) {
        self.mesh = Some(mesh);
    }

    /// Clears the outstanding request so a later refresh can retry.
    pub fn on_request_failed(&mut self) {
        self.requested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobOutput, QueuedDispatcher};
    use terra_math::ChunkCoord;

    fn setup() -> (Arc<HeightMap>, MeshSettings) {
        let settings = MeshSettings {
            chunk_size_index: 0,
            ..Default::default()
        };
        let n = settings.num_verts_per_line();
        (Arc::new(HeightMap::flat(n, n, 1.0)), settings)
    }

    fn deliver(dispatcher: &QueuedDispatcher, slot: &mut LodMeshSlot) {
        dispatcher.run_pending();
        for completion in dispatcher.drain_completed() {
            match completion.result {
                Ok(JobOutput::Mesh(mesh)) => slot.on_mesh_received(mesh),
                other => panic!("unexpected completion {other:?}"),
            }
        }
    }

    #[test]
    fn test_request_is_issued_once_while_pending() {
        let (map, settings) = setup();
        let jobs = QueuedDispatcher::new();
        let mut slot = LodMeshSlot::new(1);
        let ticket = JobTicket::mesh(ChunkCoord::ORIGIN, 1);

        assert!(matches!(
            slot.request_mesh(ticket, &map, &settings, &jobs),
            Ok(MeshRequest::Submitted)
        ));
        for _ in 0..5 {
            assert!(matches!(
                slot.request_mesh(ticket, &map, &settings, &jobs),
                Ok(MeshRequest::Pending)
            ));
        }
        assert_eq!(jobs.pending_count(), 1);
        assert_eq!(slot.requests_issued(), 1);
        assert!(slot.has_requested_mesh());
        assert!(!slot.has_mesh());
    }

    #[test]
    fn test_cached_mesh_returned_without_new_job() {
        let (map, settings) = setup();
        let jobs = QueuedDispatcher::new();
        let mut slot = LodMeshSlot::new(2);
        let ticket = JobTicket::mesh(ChunkCoord::ORIGIN, 0);

        slot.request_mesh(ticket, &map, &settings, &jobs).unwrap();
        deliver(&jobs, &mut slot);
        assert_eq!(slot.mesh().unwrap().lod, 2);

        let first = slot.request_mesh(ticket, &map, &settings, &jobs).unwrap();
        let second = slot.request_mesh(ticket, &map, &settings, &jobs).unwrap();
        match (first, second) {
            (MeshRequest::Cached(a), MeshRequest::Cached(b)) => {
                assert!(Arc::ptr_eq(&a, &b));
                assert!(Arc::ptr_eq(&a, slot.mesh().unwrap()));
            }
            other => panic!("expected cached meshes, got {other:?}"),
        }
        assert_eq!(jobs.pending_count(), 0);
        assert_eq!(slot.requests_issued(), 1);
    }

    #[test]
    fn test_failure_allows_retry() {
        let (map, settings) = setup();
        let jobs = QueuedDispatcher::new();
        let mut slot = LodMeshSlot::new(0);
        let ticket = JobTicket::mesh(ChunkCoord::ORIGIN, 0);

        slot.request_mesh(ticket, &map, &settings, &jobs).unwrap();
        jobs.fail_matching(|_| true, JobError::Panicked("boom".into()));
        assert_eq!(jobs.drain_completed().len(), 1);
        slot.on_request_failed();
        assert!(!slot.has_requested_mesh());

        assert!(matches!(
            slot.request_mesh(ticket, &map, &settings, &jobs),
            Ok(MeshRequest::Submitted)
        ));
        assert_eq!(slot.requests_issued(), 2);
    }
}
