//! Validated streaming settings shared by the grid and its chunks.

use terra_config::Config;
use terra_heightmap::HeightMapSettings;
use terra_lod::{DetailLevel, LodTable};
use terra_mesh::MeshSettings;

use crate::error::StreamError;
use crate::sink::MaterialId;

/// Default viewer displacement before the chunk window is rebuilt.
pub const DEFAULT_VIEWER_MOVE_THRESHOLD: f32 = 25.0;

/// Default distance to a chunk's edge below which its collider is assigned.
pub const DEFAULT_COLLIDER_GENERATION_THRESHOLD: f32 = 5.0;

/// Largest window radius, in chunks, a refresh may walk. Each refresh visits
/// `(2 * radius + 1)²` cells.
pub const MAX_VIEW_RADIUS_CHUNKS: i32 = 64;

/// Everything a chunk needs to know about the grid it lives in.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamSettings {
    pub mesh: MeshSettings,
    pub height_map: HeightMapSettings,
    pub lod_table: LodTable,
    /// Index into `lod_table` of the tier used for collision meshes.
    pub collider_lod_index: usize,
    pub viewer_move_threshold: f32,
    pub collider_generation_threshold: f32,
    pub material: MaterialId,
}

impl StreamSettings {
    /// Builds and validates settings with the default thresholds.
    pub fn new(
        mesh: MeshSettings,
        height_map: HeightMapSettings,
        detail_levels: Vec<DetailLevel>,
        collider_lod_index: usize,
    ) -> Result<Self, StreamError> {
        let settings = Self {
            mesh,
            height_map,
            lod_table: LodTable::new(detail_levels)?,
            collider_lod_index,
            viewer_move_threshold: DEFAULT_VIEWER_MOVE_THRESHOLD,
            collider_generation_threshold: DEFAULT_COLLIDER_GENERATION_THRESHOLD,
            material: MaterialId::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_config(config: &Config) -> Result<Self, StreamError> {
        let settings = Self {
            mesh: config.mesh.clone(),
            height_map: config.height_map.clone(),
            lod_table: LodTable::new(config.lod.detail_levels.clone())?,
            collider_lod_index: config.lod.collider_lod_index,
            viewer_move_threshold: config.streaming.viewer_move_threshold,
            collider_generation_threshold: config.streaming.collider_generation_threshold,
            material: MaterialId(config.streaming.material),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects settings that would make LOD selection, meshing or collider
    /// assignment ill-defined.
    pub fn validate(&self) -> Result<(), StreamError> {
        self.mesh.validate()?;
        self.height_map.validate()?;

        let levels = self.lod_table.levels();
        if self.collider_lod_index >= levels.len() {
            return Err(StreamError::ColliderLodOutOfRange {
                index: self.collider_lod_index,
                levels: levels.len(),
            });
        }
        for (index, level) in levels.iter().enumerate() {
            if !self.mesh.supports_lod(level.lod) {
                return Err(StreamError::UnsupportedLod {
                    index,
                    lod: level.lod,
                    chunk_size: self.mesh.chunk_size(),
                });
            }
        }
        let radius = (self.max_view_distance() / self.mesh_world_size()).ceil();
        if radius > MAX_VIEW_RADIUS_CHUNKS as f32 {
            return Err(StreamError::ViewRadiusTooLarge {
                view_distance: self.max_view_distance(),
                chunk_world_size: self.mesh_world_size(),
                max_radius: MAX_VIEW_RADIUS_CHUNKS,
            });
        }
        for (name, value) in [
            ("viewer_move_threshold", self.viewer_move_threshold),
            (
                "collider_generation_threshold",
                self.collider_generation_threshold,
            ),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(StreamError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }

    pub fn mesh_world_size(&self) -> f32 {
        self.mesh.mesh_world_size()
    }

    pub fn max_view_distance(&self) -> f32 {
        self.lod_table.max_view_distance()
    }

    /// Radius, in chunks, of the window kept around the viewer's cell.
    pub fn chunks_visible_in_view_distance(&self) -> i32 {
        (self.max_view_distance() / self.mesh_world_size()).ceil() as i32
    }

    pub fn sqr_viewer_move_threshold(&self) -> f32 {
        self.viewer_move_threshold * self.viewer_move_threshold
    }

    pub fn collider_level(&self) -> &DetailLevel {
        &self.lod_table.levels()[self.collider_lod_index]
    }
}
