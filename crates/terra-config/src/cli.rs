//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Terrain streaming demo command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "terra", about = "Chunked terrain streaming with LOD meshing")]
pub struct CliArgs {
    /// Number of simulation ticks to run.
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Terrain noise seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Index into the supported chunk sizes (0 = 48 ... 8 = 240).
    #[arg(long)]
    pub chunk_size_index: Option<usize>,

    /// Worker threads for generation jobs (0 = auto).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Run generation jobs inline on the main thread, in submission order.
    #[arg(long)]
    pub deterministic: bool,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ticks) = args.ticks {
            self.viewer.ticks = ticks;
        }
        if let Some(seed) = args.seed {
            self.height_map.noise.seed = seed;
        }
        if let Some(index) = args.chunk_size_index {
            self.mesh.chunk_size_index = index;
        }
        if let Some(workers) = args.workers {
            self.streaming.worker_threads = workers;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            ticks: Some(30),
            seed: Some(9),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.viewer.ticks, 30);
        assert_eq!(config.height_map.noise.seed, 9);
        assert_eq!(config.debug.log_level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(config.mesh.chunk_size_index, 8);
        assert_eq!(config.streaming.worker_threads, 0);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "terra",
            "--ticks",
            "5",
            "--chunk-size-index",
            "1",
            "--deterministic",
        ])
        .unwrap();
        assert_eq!(args.ticks, Some(5));
        assert_eq!(args.chunk_size_index, Some(1));
        assert!(args.deterministic);
        assert!(args.config.is_none());
    }
}
