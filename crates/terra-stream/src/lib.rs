//! Chunked terrain streaming: a sparse grid of terrain chunks around a moving
//! viewer, distance-based LOD selection, asynchronous height map and mesh
//! generation, and deferred collider assignment.
//!
//! All chunk state is owned and mutated by the thread calling
//! [`TerrainGrid::update`]. Generation runs on a [`JobDispatcher`]; its
//! completions are applied at the start of the next tick.

pub mod chunk;
pub mod error;
pub mod events;
pub mod grid;
pub mod jobs;
pub mod lod_mesh;
pub mod settings;
pub mod sink;

pub use chunk::{ChunkContext, TerrainChunk};
pub use error::StreamError;
pub use events::ChunkEvent;
pub use grid::{TerrainGrid, TickReport};
pub use jobs::{
    JobCompletion, JobDispatcher, JobError, JobKind, JobOutput, JobTicket, Producer,
    QueuedDispatcher, ThreadedDispatcher,
};
pub use lod_mesh::{LodMeshSlot, MeshRequest};
pub use settings::{MAX_VIEW_RADIUS_CHUNKS, StreamSettings};
pub use sink::{ChunkHandle, MaterialId, RecordingSink, SinkObject, TerrainSink};
