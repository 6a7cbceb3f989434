//! Level-of-detail tables: per-level visibility thresholds and distance-based LOD selection.

mod selector;

pub use selector::{DetailLevel, LodError, LodTable};
