//! Configuration system for the terrain streamer.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, Config, DebugConfig, LodConfig, StreamingConfig, ViewerConfig,
    default_config_dir,
};
pub use error::ConfigError;
