//! Notifications published by terrain chunks.

use terra_math::ChunkCoord;

use crate::jobs::{JobError, JobKind};

/// Emitted by a chunk through the channel it was given at creation.
///
/// The grid consumes `VisibilityChanged` to maintain its visible set and
/// forwards every event to the caller in the tick report.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkEvent {
    /// The chunk was shown or hidden.
    VisibilityChanged { coord: ChunkCoord, visible: bool },
    /// The chunk started rendering a different detail level (table index).
    LodChanged { coord: ChunkCoord, lod_index: usize },
    /// The chunk's collision mesh was assigned. Happens at most once.
    ColliderAssigned { coord: ChunkCoord },
    /// A generation job failed; the request flag was cleared for retry.
    JobFailed {
        coord: ChunkCoord,
        kind: JobKind,
        error: JobError,
    },
}
