//! One grid cell's streaming lifecycle: height map, LOD meshes, visibility
//! and collider.

use std::sync::Arc;

use crossbeam_channel::Sender;
use glam::Vec2;
use terra_heightmap::HeightMap;
use terra_math::{Bounds2, ChunkCoord};
use terra_mesh::MeshData;
use tracing::{debug, trace, warn};

use crate::events::ChunkEvent;
use crate::jobs::{
    JobCompletion, JobDispatcher, JobError, JobKind, JobOutput, JobTicket, height_map_producer,
};
use crate::lod_mesh::LodMeshSlot;
use crate::settings::StreamSettings;
use crate::sink::{ChunkHandle, TerrainSink};

/// Collaborators a chunk talks to while updating.
pub struct ChunkContext<'a> {
    /// Current viewer position in the world XZ plane.
    pub viewer: Vec2,
    pub jobs: &'a dyn JobDispatcher,
    pub sink: &'a mut dyn TerrainSink,
}

/// A square terrain cell streamed in around the viewer.
pub struct TerrainChunk {
    coord: ChunkCoord,
    sample_center: Vec2,
    bounds: Bounds2,
    settings: Arc<StreamSettings>,
    slots: Vec<LodMeshSlot>,
    height_map: Option<Arc<HeightMap>>,
    height_map_requested: bool,
    /// Index into the LOD table of the mesh being rendered.
    current_lod: Option<usize>,
    visible: bool,
    has_collider: bool,
    handle: ChunkHandle,
    events: Sender<ChunkEvent>,
}

impl TerrainChunk {
    /// Creates an invisible chunk and its sink object. Nothing is generated
    /// until [`load`](Self::load) is called.
    pub fn new(
        coord: ChunkCoord,
        settings: Arc<StreamSettings>,
        sink: &mut dyn TerrainSink,
        events: Sender<ChunkEvent>,
    ) -> Self {
        let world_size = settings.mesh_world_size();
        let position = coord.world_center(world_size);
        let sample_center = position / settings.mesh.mesh_scale;
        let bounds = Bounds2::from_center_size(position, Vec2::splat(world_size));

        let handle = sink.spawn_chunk(coord, position, settings.material);
        sink.set_visible(handle, false);

        let slots = settings
            .lod_table
            .levels()
            .iter()
            .map(|level| LodMeshSlot::new(level.lod))
            .collect();

        Self {
            coord,
            sample_center,
            bounds,
            settings,
            slots,
            height_map: None,
            height_map_requested: false,
            current_lod: None,
            visible: false,
            has_collider: false,
            handle,
            events,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn bounds(&self) -> &Bounds2 {
        &self.bounds
    }

    pub fn sample_center(&self) -> Vec2 {
        self.sample_center
    }

    pub fn handle(&self) -> ChunkHandle {
        self.handle
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn has_height_map(&self) -> bool {
        self.height_map.is_some()
    }

    pub fn height_map(&self) -> Option<&Arc<HeightMap>> {
        self.height_map.as_ref()
    }

    pub fn current_lod(&self) -> Option<usize> {
        self.current_lod
    }

    pub fn has_collider(&self) -> bool {
        self.has_collider
    }

    pub fn slots(&self) -> &[LodMeshSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&LodMeshSlot> {
        self.slots.get(index)
    }

    /// Requests this chunk's height map. Does nothing once a request is
    /// outstanding or the map has arrived.
    pub fn load(&mut self, jobs: &dyn JobDispatcher) {
        if self.height_map.is_some() || self.height_map_requested {
            return;
        }
        self.height_map_requested = true;
        let producer = height_map_producer(
            self.settings.mesh.num_verts_per_line(),
            self.settings.height_map.clone(),
            self.sample_center,
        );
        match jobs.submit(JobTicket::height_map(self.coord), producer) {
            Ok(()) => trace!(coord = %self.coord, "Requested height map"),
            Err(error) => self.on_job_failed(JobKind::HeightMap, error),
        }
    }

    /// Routes a finished job to the matching handler.
    pub fn apply_completion(&mut self, completion: JobCompletion, ctx: &mut ChunkContext<'_>) {
        let kind = completion.ticket.kind;
        match (kind, completion.result) {
            (JobKind::HeightMap, Ok(JobOutput::HeightMap(map))) => {
                self.on_height_map_received(map, ctx);
            }
            (JobKind::Mesh { slot }, Ok(JobOutput::Mesh(mesh))) => {
                self.on_mesh_received(slot, mesh, ctx);
            }
            (kind, Ok(_)) => self.on_job_failed(kind, JobError::UnexpectedOutput(kind)),
            (kind, Err(error)) => self.on_job_failed(kind, error),
        }
    }

    /// Stores the height map and refreshes. Later deliveries are ignored.
    pub fn on_height_map_received(&mut self, map: Arc<HeightMap>, ctx: &mut ChunkContext<'_>) {
        if self.height_map.is_some() {
            warn!(coord = %self.coord, "Ignoring duplicate height map");
            return;
        }
        self.height_map = Some(map);
        self.height_map_requested = false;
        self.update_terrain_chunk(ctx);
    }

    /// Caches a finished LOD mesh, then re-evaluates the chunk. Meshes for
    /// the collider tier also re-evaluate the collider.
    pub fn on_mesh_received(&mut self, slot: usize, mesh: Arc<MeshData>, ctx: &mut ChunkContext<'_>) {
        let Some(lod_mesh) = self.slots.get_mut(slot) else {
            warn!(coord = %self.coord, slot, "Mesh delivered for unknown LOD slot");
            return;
        };
        lod_mesh.on_mesh_received(mesh);
        self.update_terrain_chunk(ctx);
        if slot == self.settings.collider_lod_index {
            self.update_collision_mesh(ctx);
        }
    }

    /// Clears the failed request so the next refresh can retry it, and
    /// reports the failure.
    pub fn on_job_failed(&mut self, kind: JobKind, error: JobError) {
        match kind {
            JobKind::HeightMap => self.height_map_requested = false,
            JobKind::Mesh { slot } => {
                if let Some(lod_mesh) = self.slots.get_mut(slot) {
                    lod_mesh.on_request_failed();
                }
            }
        }
        warn!(coord = %self.coord, ?kind, %error, "Terrain job failed");
        let _ = self.events.send(ChunkEvent::JobFailed {
            coord: self.coord,
            kind,
            error,
        });
    }

    /// Re-evaluates visibility and the displayed LOD for the current viewer.
    ///
    /// Does nothing until the height map has arrived. A newly selected LOD
    /// is shown as soon as its mesh is cached; until then it is requested
    /// and the previous mesh stays in place.
    pub fn update_terrain_chunk(&mut self, ctx: &mut ChunkContext<'_>) {
        let Some(height_map) = self.height_map.clone() else {
            return;
        };

        let distance = self.bounds.distance(ctx.viewer);
        let was_visible = self.visible;
        let visible = self.settings.lod_table.is_visible(distance);

        if visible {
            let lod_index = self.settings.lod_table.select_index(distance);
            if self.current_lod != Some(lod_index) {
                if let Some(mesh) = self.slots[lod_index].mesh().cloned() {
                    self.current_lod = Some(lod_index);
                    ctx.sink.set_render_mesh(self.handle, mesh);
                    debug!(coord = %self.coord, lod_index, distance, "Switched LOD mesh");
                    let _ = self.events.send(ChunkEvent::LodChanged {
                        coord: self.coord,
                        lod_index,
                    });
                } else if !self.slots[lod_index].has_requested_mesh() {
                    self.request_slot(lod_index, &height_map, ctx.jobs);
                }
            }
        }

        if was_visible != visible {
            self.visible = visible;
            ctx.sink.set_visible(self.handle, visible);
            let _ = self.events.send(ChunkEvent::VisibilityChanged {
                coord: self.coord,
                visible,
            });
        }
    }

    /// Requests the collider-tier mesh once the viewer is within that tier's
    /// range, and assigns it as the collider once the viewer is almost on
    /// the chunk. After assignment this does nothing.
    pub fn update_collision_mesh(&mut self, ctx: &mut ChunkContext<'_>) {
        if self.has_collider {
            return;
        }
        let Some(height_map) = self.height_map.clone() else {
            return;
        };

        let collider_index = self.settings.collider_lod_index;
        let sqr_distance = self.bounds.sqr_distance(ctx.viewer);

        if sqr_distance < self.settings.collider_level().sqr_visible_distance_threshold()
            && !self.slots[collider_index].has_requested_mesh()
        {
            self.request_slot(collider_index, &height_map, ctx.jobs);
        }

        let threshold = self.settings.collider_generation_threshold;
        if sqr_distance < threshold * threshold
            && let Some(mesh) = self.slots[collider_index].mesh().cloned()
        {
            ctx.sink.set_collider_mesh(self.handle, mesh);
            self.has_collider = true;
            debug!(coord = %self.coord, "Assigned collider mesh");
            let _ = self.events.send(ChunkEvent::ColliderAssigned { coord: self.coord });
        }
    }

    fn request_slot(&mut self, index: usize, height_map: &Arc<HeightMap>, jobs: &dyn JobDispatcher) {
        let ticket = JobTicket::mesh(self.coord, index);
        if let Err(error) =
            self.slots[index].request_mesh(ticket, height_map, &self.settings.mesh, jobs)
        {
            self.on_job_failed(ticket.kind, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::QueuedDispatcher;
    use crate::sink::RecordingSink;
    use crossbeam_channel::Receiver;
    use terra_heightmap::HeightMapSettings;
    use terra_lod::DetailLevel;
    use terra_mesh::MeshSettings;

    /// 48-unit chunks with tiers at 100 / 300 / 600 world units.
    fn settings() -> Arc<StreamSettings> {
        let mesh = MeshSettings {
            mesh_scale: 1.0,
            chunk_size_index: 0,
        };
        let mut height_map = HeightMapSettings::default();
        height_map.noise.octaves = 2;
        Arc::new(
            StreamSettings::new(
                mesh,
                height_map,
                vec![
                    DetailLevel::new(0, 100.0),
                    DetailLevel::new(1, 300.0),
                    DetailLevel::new(2, 600.0),
                ],
                0,
            )
            .unwrap(),
        )
    }

    struct Harness {
        jobs: QueuedDispatcher,
        sink: RecordingSink,
        events: Receiver<ChunkEvent>,
        chunk: TerrainChunk,
    }

    impl Harness {
        fn new() -> Self {
            let jobs = QueuedDispatcher::new();
            let mut sink = RecordingSink::new();
            let (tx, rx) = crossbeam_channel::unbounded();
            let chunk = TerrainChunk::new(ChunkCoord::ORIGIN, settings(), &mut sink, tx);
            Self {
                jobs,
                sink,
                events: rx,
                chunk,
            }
        }

        /// Viewer on the +X axis, `distance` units past the chunk's edge.
        fn viewer_at(distance: f32) -> Vec2 {
            Vec2::new(24.0 + distance, 0.0)
        }

        fn update(&mut self, viewer: Vec2) {
            let mut ctx = ChunkContext {
                viewer,
                jobs: &self.jobs,
                sink: &mut self.sink,
            };
            self.chunk.update_terrain_chunk(&mut ctx);
        }

        fn update_collision(&mut self, viewer: Vec2) {
            let mut ctx = ChunkContext {
                viewer,
                jobs: &self.jobs,
                sink: &mut self.sink,
            };
            self.chunk.update_collision_mesh(&mut ctx);
        }

        /// Runs every pending job and feeds the results back.
        fn deliver_all(&mut self, viewer: Vec2) {
            self.jobs.run_pending();
            for completion in self.jobs.drain_completed() {
                let mut ctx = ChunkContext {
                    viewer,
                    jobs: &self.jobs,
                    sink: &mut self.sink,
                };
                self.chunk.apply_completion(completion, &mut ctx);
            }
        }

        fn events(&self) -> Vec<ChunkEvent> {
            self.events.try_iter().collect()
        }
    }

    #[test]
    fn test_new_chunk_is_invisible_with_bounds() {
        let h = Harness::new();
        assert!(!h.chunk.is_visible());
        assert_eq!(h.chunk.current_lod(), None);
        assert_eq!(h.chunk.slots().len(), 3);
        assert_eq!(h.chunk.bounds().size(), Vec2::splat(48.0));
        assert!(!h.sink.get(h.chunk.handle()).unwrap().visible);
    }

    #[test]
    fn test_bounds_centered_on_scaled_coord() {
        let mut sink = RecordingSink::new();
        let (tx, _rx) = crossbeam_channel::unbounded();
        let chunk = TerrainChunk::new(ChunkCoord::new(2, -1), settings(), &mut sink, tx);
        assert_eq!(chunk.bounds().center, Vec2::new(96.0, -48.0));
        assert_eq!(chunk.sample_center(), Vec2::new(96.0, -48.0));
        assert_eq!(sink.get(chunk.handle()).unwrap().position, Vec2::new(96.0, -48.0));
    }

    #[test]
    fn test_load_requests_height_map_once() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        h.chunk.load(&h.jobs);
        assert_eq!(
            h.jobs.pending_tickets(),
            vec![JobTicket::height_map(ChunkCoord::ORIGIN)]
        );
        h.deliver_all(Harness::viewer_at(1000.0));
        h.chunk.load(&h.jobs);
        assert_eq!(h.jobs.pending_count(), 0);
        assert!(h.chunk.has_height_map());
    }

    #[test]
    fn test_updates_before_height_map_are_noops() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        let viewer = Harness::viewer_at(50.0);
        for _ in 0..3 {
            h.update(viewer);
            assert!(!h.chunk.is_visible());
            assert_eq!(h.jobs.pending_count(), 1, "only the height map is queued");
        }

        h.jobs.run_pending();
        let completions = h.jobs.drain_completed();
        for completion in completions {
            let mut ctx = ChunkContext {
                viewer,
                jobs: &h.jobs,
                sink: &mut h.sink,
            };
            h.chunk.apply_completion(completion, &mut ctx);
        }
        h.update(viewer);
        assert!(h.chunk.is_visible());
        assert_eq!(
            h.jobs.pending_tickets(),
            vec![JobTicket::mesh(ChunkCoord::ORIGIN, 0)]
        );
    }

    #[test]
    fn test_near_viewer_selects_finest_lod_and_becomes_visible() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        let viewer = Harness::viewer_at(50.0);
        h.deliver_all(viewer); // height map, then LOD 0 request
        assert!(h.chunk.is_visible());
        assert_eq!(h.chunk.current_lod(), None);

        h.deliver_all(viewer); // LOD 0 mesh
        assert_eq!(h.chunk.current_lod(), Some(0));
        let object = h.sink.get(h.chunk.handle()).unwrap();
        assert!(object.visible);
        assert_eq!(object.render_mesh.as_ref().unwrap().lod, 0);

        let events = h.events();
        assert!(events.contains(&ChunkEvent::VisibilityChanged {
            coord: ChunkCoord::ORIGIN,
            visible: true
        }));
        assert!(events.contains(&ChunkEvent::LodChanged {
            coord: ChunkCoord::ORIGIN,
            lod_index: 0
        }));
    }

    #[test]
    fn test_far_viewer_hides_chunk_without_lod_change() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        let near = Harness::viewer_at(50.0);
        h.deliver_all(near);
        h.deliver_all(near);
        assert_eq!(h.chunk.current_lod(), Some(0));
        h.events();

        h.update(Harness::viewer_at(650.0));
        assert!(!h.chunk.is_visible());
        assert_eq!(h.chunk.current_lod(), Some(0));
        assert_eq!(h.jobs.pending_count(), 0);
        assert_eq!(
            h.events(),
            vec![ChunkEvent::VisibilityChanged {
                coord: ChunkCoord::ORIGIN,
                visible: false
            }]
        );
        assert!(!h.sink.get(h.chunk.handle()).unwrap().visible);
    }

    #[test]
    fn test_visibility_boundary_is_inclusive() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        h.deliver_all(Harness::viewer_at(600.0));
        assert!(h.chunk.is_visible());
        h.update(Harness::viewer_at(600.5));
        assert!(!h.chunk.is_visible());
    }

    #[test]
    fn test_repeated_updates_do_not_reissue_requests() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        let viewer = Harness::viewer_at(150.0);
        h.deliver_all(viewer);
        for _ in 0..10 {
            h.update(viewer);
        }
        assert_eq!(h.jobs.pending_tickets(), vec![JobTicket::mesh(ChunkCoord::ORIGIN, 1)]);
        assert_eq!(h.chunk.slot(1).unwrap().requests_issued(), 1);
    }

    #[test]
    fn test_switching_back_uses_cached_mesh() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        let near = Harness::viewer_at(50.0);
        let mid = Harness::viewer_at(200.0);
        h.deliver_all(near);
        h.deliver_all(near);
        h.update(mid);
        h.deliver_all(mid);
        assert_eq!(h.chunk.current_lod(), Some(1));

        h.update(near);
        assert_eq!(h.chunk.current_lod(), Some(0));
        assert_eq!(h.jobs.pending_count(), 0);
        let object = h.sink.get(h.chunk.handle()).unwrap();
        assert!(Arc::ptr_eq(
            object.render_mesh.as_ref().unwrap(),
            h.chunk.slot(0).unwrap().mesh().unwrap()
        ));
        assert_eq!(object.render_mesh_swaps, 3);
    }

    #[test]
    fn test_collider_requested_in_range_and_assigned_when_close() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        let far = Harness::viewer_at(500.0);
        h.deliver_all(far);
        h.jobs.run_pending();
        h.jobs.drain_completed(); // discard the LOD 2 mesh; not relevant here

        h.update_collision(far);
        assert_eq!(h.jobs.pending_count(), 0, "outside collider tier range");

        let in_range = Harness::viewer_at(50.0);
        h.update_collision(in_range);
        assert_eq!(
            h.jobs.pending_tickets(),
            vec![JobTicket::mesh(ChunkCoord::ORIGIN, 0)]
        );
        h.deliver_all(in_range);
        assert!(!h.chunk.has_collider(), "too far for collider assignment");

        let close = Harness::viewer_at(4.0);
        h.update_collision(close);
        assert!(h.chunk.has_collider());
        assert!(h.events().contains(&ChunkEvent::ColliderAssigned {
            coord: ChunkCoord::ORIGIN
        }));
    }

    #[test]
    fn test_collider_assignment_is_monotonic() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        let inside = Vec2::ZERO;
        h.deliver_all(inside);
        h.deliver_all(inside); // LOD 0 mesh arrives; collider slot callback assigns
        assert!(h.chunk.has_collider());

        for viewer in [Vec2::new(5000.0, 0.0), inside, Vec2::new(1.0, 1.0)] {
            h.update_collision(viewer);
            h.update(viewer);
            assert!(h.chunk.has_collider());
        }
        assert_eq!(
            h.sink.get(h.chunk.handle()).unwrap().collider_assignments,
            1
        );
    }

    #[test]
    fn test_failed_mesh_job_is_retried() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        let viewer = Harness::viewer_at(50.0);
        h.deliver_all(viewer);
        h.jobs
            .fail_matching(|_| true, JobError::Panicked("out of memory".into()));
        for completion in h.jobs.drain_completed() {
            let mut ctx = ChunkContext {
                viewer,
                jobs: &h.jobs,
                sink: &mut h.sink,
            };
            h.chunk.apply_completion(completion, &mut ctx);
        }
        assert!(!h.chunk.slot(0).unwrap().has_requested_mesh());
        assert!(h.events().iter().any(|e| matches!(
            e,
            ChunkEvent::JobFailed {
                kind: JobKind::Mesh { slot: 0 },
                ..
            }
        )));

        h.update(viewer);
        assert_eq!(h.chunk.slot(0).unwrap().requests_issued(), 2);
        h.deliver_all(viewer);
        assert_eq!(h.chunk.current_lod(), Some(0));
    }

    #[test]
    fn test_failed_height_map_can_be_reloaded() {
        let mut h = Harness::new();
        h.chunk.load(&h.jobs);
        h.jobs.fail_matching(|_| true, JobError::Disconnected);
        h.deliver_all(Vec2::ZERO);
        assert!(!h.chunk.has_height_map());

        h.chunk.load(&h.jobs);
        assert_eq!(h.jobs.pending_count(), 1);
        h.deliver_all(Vec2::ZERO);
        assert!(h.chunk.has_height_map());
    }
}
