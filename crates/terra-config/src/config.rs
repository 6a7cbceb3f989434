//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use terra_heightmap::HeightMapSettings;
use terra_lod::DetailLevel;
use terra_mesh::MeshSettings;

use crate::error::ConfigError;

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Chunk mesh resolution and scale.
    pub mesh: MeshSettings,
    /// Terrain noise and height shaping.
    pub height_map: HeightMapSettings,
    /// Level-of-detail tiers and collider tier.
    pub lod: LodConfig,
    /// Chunk streaming behaviour.
    pub streaming: StreamingConfig,
    /// Scripted viewer used by the demo driver.
    pub viewer: ViewerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Level-of-detail configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Tiers ordered finest first, thresholds strictly increasing.
    pub detail_levels: Vec<DetailLevel>,
    /// Index into `detail_levels` of the tier used for collision meshes.
    pub collider_lod_index: usize,
}

/// Chunk streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Viewer displacement (world units) before the chunk window is rebuilt.
    pub viewer_move_threshold: f32,
    /// Distance to a chunk's edge below which its collider is assigned.
    pub collider_generation_threshold: f32,
    /// Worker threads for height map and mesh jobs (0 = pick from CPU count).
    pub worker_threads: usize,
    /// Opaque material id handed to the render sink for every chunk.
    pub material: u32,
}

/// Scripted viewer path: constant velocity from a start point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Start position in the world XZ plane.
    pub start: [f32; 2],
    /// Velocity in world units per second.
    pub velocity: [f32; 2],
    /// Number of fixed simulation ticks to run.
    pub ticks: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            detail_levels: vec![
                DetailLevel::new(0, 200.0),
                DetailLevel::new(1, 400.0),
                DetailLevel::new(4, 600.0),
            ],
            collider_lod_index: 0,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            viewer_move_threshold: 25.0,
            collider_generation_threshold: 5.0,
            worker_threads: 0,
            material: 0,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            start: [0.0, 0.0],
            velocity: [60.0, 15.0],
            ticks: 1200,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

/// Platform config directory for this application, if the platform has one.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("terra"))
        .ok_or(ConfigError::NoConfigDir)
}

impl Config {
    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// when the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Self::default();
            config.save(config_dir)?;
            log::info!("Wrote default terrain config to {}", path.display());
            return Ok(config);
        }
        let config = Self::read(&path)?;
        log::info!("Loaded terrain config from {}", path.display());
        Ok(config)
    }

    /// Writes `config.ron` into `config_dir`, creating the directory.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so a concurrent [`reload`](Self::reload) never sees a partial file.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::write(config_dir))?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        let path = config_dir.join(CONFIG_FILE_NAME);
        let staging = path.with_extension("ron.tmp");
        std::fs::write(&staging, text).map_err(ConfigError::write(&staging))?;
        std::fs::rename(&staging, &path).map_err(ConfigError::write(&path))
    }

    /// Re-reads `config.ron`. Returns the new config only if it differs from
    /// `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read(&config_dir.join(CONFIG_FILE_NAME))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!(
            "Terrain config changed: {}",
            self.changed_sections(&fresh).join(", ")
        );
        Ok(Some(fresh))
    }

    /// Names of the top-level sections that differ between `self` and `other`.
    pub fn changed_sections(&self, other: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.mesh != other.mesh {
            changed.push("mesh");
        }
        if self.height_map != other.height_map {
            changed.push("height_map");
        }
        if self.lod != other.lod {
            changed.push("lod");
        }
        if self.streaming != other.streaming {
            changed.push("streaming");
        }
        if self.viewer != other.viewer {
            changed.push("viewer");
        }
        if self.debug != other.debug {
            changed.push("debug");
        }
        changed
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::read(path))?;
        ron::from_str(&text).map_err(ConfigError::ParseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(4))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("viewer_move_threshold: 25.0"));
        assert!(ron_str.contains("collider_lod_index: 0"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(mesh: (), lod: (collider_lod_index: 1))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.streaming, StreamingConfig::default());
        assert_eq!(config.lod.collider_lod_index, 1);
        assert_eq!(config.lod.detail_levels.len(), 3);
    }

    #[test]
    fn test_detail_levels_parse() {
        let ron_str = "(lod: (detail_levels: [(lod: 0, visible_distance_threshold: 100.0), \
                       (lod: 2, visible_distance_threshold: 300.0)]))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(
            config.lod.detail_levels,
            vec![DetailLevel::new(0, 100.0), DetailLevel::new(2, 300.0)]
        );
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.mesh.chunk_size_index = 2;
        config.height_map.noise.seed = 77;
        config.viewer.ticks = 10;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.streaming.viewer_move_threshold = 50.0;
        modified.save(dir.path()).unwrap();

        let reloaded = config.reload(dir.path()).unwrap().unwrap();
        assert_eq!(reloaded.streaming.viewer_move_threshold, 50.0);
        assert_eq!(config.changed_sections(&reloaded), vec!["streaming"]);
        assert!(!dir.path().join("config.ron.tmp").exists());
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
