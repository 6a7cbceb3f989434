//! Terrain grid manager: keeps a window of chunks around a moving viewer.
//!
//! Every tick applies finished generation jobs, refines colliders of the
//! visible chunks when the viewer moved, and, once the viewer has drifted
//! past the move threshold since the last full refresh, rebuilds the window
//! of chunks around it. Chunks are never removed, only hidden.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};
use terra_math::ChunkCoord;
use tracing::{debug, trace, warn};

use crate::chunk::{ChunkContext, TerrainChunk};
use crate::error::StreamError;
use crate::events::ChunkEvent;
use crate::jobs::JobDispatcher;
use crate::settings::StreamSettings;
use crate::sink::TerrainSink;

/// Result of a single [`TerrainGrid::update`].
#[derive(Debug, Default)]
pub struct TickReport {
    /// Whether the chunk window was rebuilt this tick.
    pub full_refresh: bool,
    /// Chunks created by the refresh.
    pub chunks_created: usize,
    /// Job completions applied at the start of the tick.
    pub completions_applied: usize,
    /// Colliders assigned this tick.
    pub colliders_assigned: usize,
    /// Everything the chunks published this tick, in order.
    pub events: Vec<ChunkEvent>,
}

impl TickReport {
    pub fn failed_jobs(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ChunkEvent::JobFailed { .. }))
            .count()
    }
}

/// Sparse, append-only grid of [`TerrainChunk`]s driven by viewer movement.
pub struct TerrainGrid<D: JobDispatcher, S: TerrainSink> {
    settings: Arc<StreamSettings>,
    jobs: D,
    sink: S,
    chunks: FxHashMap<ChunkCoord, TerrainChunk>,
    /// Visible chunks in the order they became visible.
    visible_chunks: Vec<ChunkCoord>,
    events_tx: Sender<ChunkEvent>,
    events_rx: Receiver<ChunkEvent>,
    /// Viewer position at the previous tick.
    viewer_position: Option<Vec2>,
    /// Viewer position at the last full refresh.
    viewer_position_old: Option<Vec2>,
    full_refresh_count: u64,
}

impl<D: JobDispatcher, S: TerrainSink> TerrainGrid<D, S> {
    /// Creates an empty grid. Fails if `settings` are inconsistent.
    pub fn new(settings: StreamSettings, jobs: D, sink: S) -> Result<Self, StreamError> {
        settings.validate()?;
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        debug!(
            chunk_size = settings.mesh.chunk_size(),
            world_size = settings.mesh_world_size(),
            view_distance = settings.max_view_distance(),
            radius = settings.chunks_visible_in_view_distance(),
            "Created terrain grid"
        );

        Ok(Self {
            settings: Arc::new(settings),
            jobs,
            sink,
            chunks: FxHashMap::default(),
            visible_chunks: Vec::new(),
            events_tx,
            events_rx,
            viewer_position: None,
            viewer_position_old: None,
            full_refresh_count: 0,
        })
    }

    /// Advances the grid by one tick with the viewer at `viewer` (world XZ).
    pub fn update(&mut self, viewer: Vec2) -> TickReport {
        let mut report = TickReport {
            completions_applied: self.apply_completions(viewer),
            ..Default::default()
        };
        self.process_events(&mut report);

        if self.viewer_position != Some(viewer) {
            self.update_collision_meshes(viewer);
        }

        let needs_refresh = match self.viewer_position_old {
            None => true,
            Some(old) => {
                (old - viewer).length_squared() > self.settings.sqr_viewer_move_threshold()
            }
        };
        if needs_refresh {
            self.viewer_position_old = Some(viewer);
            report.full_refresh = true;
            report.chunks_created = self.update_visible_chunks(viewer);
            self.full_refresh_count += 1;
        }

        self.viewer_position = Some(viewer);
        self.process_events(&mut report);
        report
    }

    fn apply_completions(&mut self, viewer: Vec2) -> usize {
        let completions = self.jobs.drain_completed();
        let applied = completions.len();
        let mut ctx = ChunkContext {
            viewer,
            jobs: &self.jobs,
            sink: &mut self.sink,
        };
        for completion in completions {
            let coord = completion.ticket.coord;
            match self.chunks.get_mut(&coord) {
                Some(chunk) => {
                    trace!(
                        %coord,
                        kind = ?completion.ticket.kind,
                        elapsed_us = completion.elapsed_us,
                        "Applying job completion"
                    );
                    chunk.apply_completion(completion, &mut ctx);
                }
                None => warn!(%coord, "Dropping completion for unknown chunk"),
            }
        }
        applied
    }

    fn update_collision_meshes(&mut self, viewer: Vec2) {
        let mut ctx = ChunkContext {
            viewer,
            jobs: &self.jobs,
            sink: &mut self.sink,
        };
        for coord in &self.visible_chunks {
            if let Some(chunk) = self.chunks.get_mut(coord) {
                chunk.update_collision_mesh(&mut ctx);
            }
        }
    }

    /// Refreshes every visible chunk, then every coordinate in the window
    /// around the viewer's cell, creating chunks that do not exist yet.
    /// Returns the number of chunks created.
    fn update_visible_chunks(&mut self, viewer: Vec2) -> usize {
        let Self {
            settings,
            jobs,
            sink,
            chunks,
            visible_chunks,
            events_tx,
            ..
        } = self;
        let mut ctx = ChunkContext {
            viewer,
            jobs: &*jobs,
            sink: &mut *sink,
        };

        let mut already_updated = FxHashSet::default();
        for coord in visible_chunks.iter().rev() {
            already_updated.insert(*coord);
            if let Some(chunk) = chunks.get_mut(coord) {
                chunk.update_terrain_chunk(&mut ctx);
            }
        }

        let current = ChunkCoord::containing(viewer, settings.mesh_world_size());
        let radius = settings.chunks_visible_in_view_distance();
        let mut created = 0;
        for coord in current.window(radius) {
            if already_updated.contains(&coord) {
                continue;
            }
            match chunks.entry(coord) {
                Entry::Occupied(mut entry) => {
                    let chunk = entry.get_mut();
                    chunk.load(ctx.jobs);
                    chunk.update_terrain_chunk(&mut ctx);
                }
                Entry::Vacant(entry) => {
                    let mut chunk = TerrainChunk::new(
                        coord,
                        Arc::clone(settings),
                        &mut *ctx.sink,
                        events_tx.clone(),
                    );
                    chunk.load(ctx.jobs);
                    entry.insert(chunk);
                    created += 1;
                }
            }
        }

        debug!(
            cell = %current,
            created,
            total = chunks.len(),
            visible = visible_chunks.len(),
            "Refreshed terrain window"
        );
        created
    }

    /// Applies visibility changes to the visible list and forwards every
    /// event into the report.
    fn process_events(&mut self, report: &mut TickReport) {
        for event in self.events_rx.try_iter() {
            match &event {
                ChunkEvent::VisibilityChanged {
                    coord,
                    visible: true,
                } => {
                    if !self.visible_chunks.contains(coord) {
                        self.visible_chunks.push(*coord);
                    }
                }
                ChunkEvent::VisibilityChanged {
                    coord,
                    visible: false,
                } => self.visible_chunks.retain(|c| c != coord),
                ChunkEvent::ColliderAssigned { .. } => report.colliders_assigned += 1,
                ChunkEvent::LodChanged { .. } | ChunkEvent::JobFailed { .. } => {}
            }
            report.events.push(event);
        }
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn jobs(&self) -> &D {
        &self.jobs
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn visible_chunks(&self) -> &[ChunkCoord] {
        &self.visible_chunks
    }

    /// Full window refreshes performed so far.
    pub fn full_refresh_count(&self) -> u64 {
        self.full_refresh_count
    }
}
