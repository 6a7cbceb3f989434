//! Off-thread generation jobs with completion delivery to the control thread.
//!
//! A job is a boxed producer tagged with a [`JobTicket`] naming the chunk and
//! slot that asked for it. Dispatchers run producers wherever they like but
//! only hand results back through [`JobDispatcher::drain_completed`], which
//! the grid calls from its own thread between ticks.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use glam::Vec2;
use terra_heightmap::{HeightMap, HeightMapError, HeightMapSettings, generate_height_map};
use terra_math::ChunkCoord;
use terra_mesh::{MeshData, MeshError, MeshSettings, generate_terrain_mesh};
use tracing::debug;

/// What a job produces for its chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    HeightMap,
    /// Mesh for the LOD slot at this index in the chunk's detail table.
    Mesh { slot: usize },
}

/// Routes a completion back to the chunk and slot that requested it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobTicket {
    pub coord: ChunkCoord,
    pub kind: JobKind,
}

impl JobTicket {
    pub fn height_map(coord: ChunkCoord) -> Self {
        Self {
            coord,
            kind: JobKind::HeightMap,
        }
    }

    pub fn mesh(coord: ChunkCoord, slot: usize) -> Self {
        Self {
            coord,
            kind: JobKind::Mesh { slot },
        }
    }
}

/// Successful job output. Shared immutably once produced.
#[derive(Clone, Debug)]
pub enum JobOutput {
    HeightMap(Arc<HeightMap>),
    Mesh(Arc<MeshData>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
    #[error("height map generation failed: {0}")]
    HeightMap(#[from] HeightMapError),

    #[error("mesh generation failed: {0}")]
    Mesh(#[from] MeshError),

    #[error("job panicked: {0}")]
    Panicked(String),

    #[error("job dispatcher is shut down")]
    Disconnected,

    #[error("job returned output of the wrong kind for {0:?}")]
    UnexpectedOutput(JobKind),
}

/// A finished job, successful or not.
#[derive(Debug)]
pub struct JobCompletion {
    pub ticket: JobTicket,
    pub result: Result<JobOutput, JobError>,
    /// Time spent in the producer, in microseconds.
    pub elapsed_us: u64,
}

/// Work executed by a dispatcher.
pub type Producer = Box<dyn FnOnce() -> Result<JobOutput, JobError> + Send + 'static>;

/// Runs producers and delivers their results back to the caller's thread.
pub trait JobDispatcher {
    /// Queue a producer. Fails only if the dispatcher can no longer run jobs.
    fn submit(&self, ticket: JobTicket, producer: Producer) -> Result<(), JobError>;

    /// Take every completion that has arrived since the last call.
    fn drain_completed(&self) -> Vec<JobCompletion>;

    /// Jobs submitted whose completion has not been drained yet.
    fn in_flight_count(&self) -> usize;
}

/// Producer generating a square height map centred on `sample_center`.
pub fn height_map_producer(
    num_verts_per_line: usize,
    settings: HeightMapSettings,
    sample_center: Vec2,
) -> Producer {
    Box::new(move || {
        let map =
            generate_height_map(num_verts_per_line, num_verts_per_line, &settings, sample_center)?;
        Ok(JobOutput::HeightMap(Arc::new(map)))
    })
}

/// Producer building the mesh for `height_map` at `lod`.
pub fn mesh_producer(height_map: Arc<HeightMap>, settings: MeshSettings, lod: u32) -> Producer {
    Box::new(move || {
        let mesh = generate_terrain_mesh(&height_map, &settings, lod)?;
        Ok(JobOutput::Mesh(Arc::new(mesh)))
    })
}

/// Runs a producer, turning a panic into [`JobError::Panicked`].
fn run_producer(producer: Producer) -> (Result<JobOutput, JobError>, u64) {
    let start = Instant::now();
    let result = match panic::catch_unwind(AssertUnwindSafe(producer)) {
        Ok(result) => result,
        Err(payload) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
    };
    (result, start.elapsed().as_micros() as u64)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

struct QueuedJob {
    ticket: JobTicket,
    producer: Producer,
}

/// Dispatcher backed by a pool of worker threads.
///
/// Producers are fed to the workers through a channel and results come back
/// through a second one; nothing reaches chunk state until
/// [`drain_completed`](JobDispatcher::drain_completed) is called.
pub struct ThreadedDispatcher {
    /// Channel sender for submitting jobs to workers.
    task_sender: Option<Sender<QueuedJob>>,
    /// Channel receiver for collecting completed jobs on the control thread.
    result_receiver: Receiver<JobCompletion>,
    /// Handles to the worker threads (for shutdown).
    worker_handles: Vec<JoinHandle<()>>,
    /// Submitted but not yet drained.
    in_flight: Arc<AtomicUsize>,
}

impl ThreadedDispatcher {
    /// Creates a dispatcher with `worker_count` threads (at least one).
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<QueuedJob>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let mut handles = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let rx = task_rx.clone();
            let tx = result_tx.clone();

            let handle = std::thread::Builder::new()
                .name(format!("terrain-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let (result, elapsed_us) = run_producer(job.producer);
                        let _ = tx.send(JobCompletion {
                            ticket: job.ticket,
                            result,
                            elapsed_us,
                        });
                    }
                })
                .expect("Failed to spawn terrain worker thread");
            handles.push(handle);
        }

        debug!(workers = worker_count, "Started terrain job dispatcher");

        Self {
            task_sender: Some(task_tx),
            result_receiver: result_rx,
            worker_handles: handles,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a dispatcher sized to the machine, leaving a core for the
    /// control thread.
    pub fn with_defaults() -> Self {
        let cpus = num_cpus::get().max(2);
        Self::new(cpus - 1)
    }

    /// Creates a dispatcher with `worker_count` threads, or the default
    /// sizing when `worker_count` is zero.
    pub fn with_worker_count(worker_count: usize) -> Self {
        if worker_count == 0 {
            Self::with_defaults()
        } else {
            Self::new(worker_count)
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_handles.len()
    }

    /// Shut down all worker threads gracefully.
    ///
    /// Queued jobs still run; their results stay drainable.
    pub fn shutdown(&mut self) {
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl JobDispatcher for ThreadedDispatcher {
    fn submit(&self, ticket: JobTicket, producer: Producer) -> Result<(), JobError> {
        let sender = self.task_sender.as_ref().ok_or(JobError::Disconnected)?;
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        if sender.send(QueuedJob { ticket, producer }).is_err() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return Err(JobError::Disconnected);
        }
        Ok(())
    }

    fn drain_completed(&self) -> Vec<JobCompletion> {
        let results: Vec<_> = self.result_receiver.try_iter().collect();
        self.in_flight.fetch_sub(results.len(), Ordering::Relaxed);
        results
    }

    fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Drop for ThreadedDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Single-threaded dispatcher that runs jobs only when told to.
///
/// Gives tests and deterministic runs full control over when each
/// completion arrives.
#[derive(Default)]
pub struct QueuedDispatcher {
    pending: RefCell<VecDeque<QueuedJob>>,
    completed: RefCell<Vec<JobCompletion>>,
}

impl QueuedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs submitted but not yet run.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Tickets of jobs submitted but not yet run, oldest first.
    pub fn pending_tickets(&self) -> Vec<JobTicket> {
        self.pending.borrow().iter().map(|job| job.ticket).collect()
    }

    /// Run the oldest pending job. Returns its ticket.
    pub fn run_next(&self) -> Option<JobTicket> {
        let job = self.pending.borrow_mut().pop_front()?;
        let ticket = job.ticket;
        self.complete(ticket, job.producer);
        Some(ticket)
    }

    /// Run every job pending at the time of the call. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.run_matching(|_| true)
    }

    /// Run pending jobs whose ticket matches, keeping the rest queued.
    pub fn run_matching(&self, mut filter: impl FnMut(&JobTicket) -> bool) -> usize {
        let selected = self.take_matching(&mut filter);
        let count = selected.len();
        for job in selected {
            self.complete(job.ticket, job.producer);
        }
        count
    }

    /// Complete matching pending jobs with `error` without running them.
    pub fn fail_matching(&self, mut filter: impl FnMut(&JobTicket) -> bool, error: JobError) -> usize {
        let selected = self.take_matching(&mut filter);
        let count = selected.len();
        let mut completed = self.completed.borrow_mut();
        for job in selected {
            completed.push(JobCompletion {
                ticket: job.ticket,
                result: Err(error.clone()),
                elapsed_us: 0,
            });
        }
        count
    }

    fn take_matching(&self, filter: &mut impl FnMut(&JobTicket) -> bool) -> Vec<QueuedJob> {
        let mut pending = self.pending.borrow_mut();
        let mut selected = Vec::new();
        let mut kept = VecDeque::with_capacity(pending.len());
        for job in pending.drain(..) {
            if filter(&job.ticket) {
                selected.push(job);
            } else {
                kept.push_back(job);
            }
        }
        *pending = kept;
        selected
    }

    fn complete(&self, ticket: JobTicket, producer: Producer) {
        let (result, elapsed_us) = run_producer(producer);
        self.completed.borrow_mut().push(JobCompletion {
            ticket,
            result,
            elapsed_us,
        });
    }
}

impl JobDispatcher for QueuedDispatcher {
    fn submit(&self, ticket: JobTicket, producer: Producer) -> Result<(), JobError> {
        self.pending
            .borrow_mut()
            .push_back(QueuedJob { ticket, producer });
        Ok(())
    }

    fn drain_completed(&self) -> Vec<JobCompletion> {
        std::mem::take(&mut *self.completed.borrow_mut())
    }

    fn in_flight_count(&self) -> usize {
        self.pending.borrow().len() + self.completed.borrow().len()
    }
}
