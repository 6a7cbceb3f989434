//! Terrain streaming demo.
//!
//! Walks a viewer across an endless noise terrain for a fixed number of
//! simulation ticks while the grid streams chunks in around it.
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p terra-demo -- --ticks 600 --deterministic`.

mod game_loop;
mod viewer;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use terra_config::{CliArgs, Config, default_config_dir};
use terra_stream::{
    JobDispatcher, QueuedDispatcher, RecordingSink, StreamSettings, TerrainGrid,
    ThreadedDispatcher,
};
use tracing::{debug, error, info, warn};

use crate::game_loop::{FIXED_DT, GameLoop};
use crate::viewer::ViewerPath;

/// Totals collected over one run.
#[derive(Debug, Default)]
struct RunStats {
    ticks: u32,
    completions: usize,
    failed_jobs: usize,
    colliders: usize,
}

/// Steps the grid along `path` for `ticks` fixed steps.
///
/// `pump` runs before every step so inline dispatchers can execute their
/// queue. With `realtime` the loop follows wall-clock time; otherwise every
/// spin advances exactly one step.
fn run<D: JobDispatcher>(
    grid: &mut TerrainGrid<D, RecordingSink>,
    path: &ViewerPath,
    ticks: u32,
    realtime: bool,
    mut pump: impl FnMut(&D),
) -> RunStats {
    let mut game_loop = GameLoop::new();
    let mut stats = RunStats::default();

    while stats.ticks < ticks {
        let step = |sim_time: f64| {
            if stats.ticks >= ticks {
                return;
            }
            pump(grid.jobs());
            let viewer = path.position_at(sim_time);
            let report = grid.update(viewer);

            stats.completions += report.completions_applied;
            stats.failed_jobs += report.failed_jobs();
            stats.colliders += report.colliders_assigned;
            if report.full_refresh {
                debug!(
                    tick = stats.ticks,
                    x = viewer.x,
                    z = viewer.y,
                    created = report.chunks_created,
                    chunks = grid.chunk_count(),
                    visible = grid.visible_chunks().len(),
                    in_flight = grid.jobs().in_flight_count(),
                    "Refreshed chunk window"
                );
            }
            stats.ticks += 1;
        };

        if realtime {
            game_loop.tick(step);
            std::thread::sleep(Duration::from_millis(1));
        } else {
            game_loop.advance(FIXED_DT, step);
        }
    }
    stats
}

fn log_summary<D: JobDispatcher>(
    grid: &TerrainGrid<D, RecordingSink>,
    stats: &RunStats,
    started: Instant,
) {
    info!(
        ticks = stats.ticks,
        elapsed_ms = started.elapsed().as_millis() as u64,
        refreshes = grid.full_refresh_count(),
        chunks = grid.chunk_count(),
        visible = grid.visible_chunks().len(),
        rendered = grid.sink().objects().iter().filter(|o| o.render_mesh.is_some()).count(),
        colliders = stats.colliders,
        completions = stats.completions,
        in_flight = grid.jobs().in_flight_count(),
        "Terrain run finished"
    );
    if stats.failed_jobs > 0 {
        warn!(failed = stats.failed_jobs, "Some generation jobs failed");
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = match args.config.clone() {
        Some(dir) => Some(dir),
        None => match default_config_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                eprintln!("{e}, using default config");
                None
            }
        },
    };

    // Load or create config, then apply CLI overrides
    let mut config = match &config_dir {
        Some(dir) => Config::load_or_create(dir).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }),
        None => Config::default(),
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    terra_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    let settings = match StreamSettings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid terrain configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        seed = config.height_map.noise.seed,
        chunk_size = settings.mesh.chunk_size(),
        view_distance = settings.max_view_distance(),
        ticks = config.viewer.ticks,
        "Starting terrain streaming"
    );

    let path = ViewerPath::from_config(&config.viewer);
    let ticks = config.viewer.ticks;
    let started = Instant::now();

    let result = if args.deterministic {
        info!("Running generation jobs inline");
        TerrainGrid::new(settings, QueuedDispatcher::new(), RecordingSink::new()).map(
            |mut grid| {
                let stats = run(&mut grid, &path, ticks, false, |jobs| {
                    jobs.run_pending();
                });
                log_summary(&grid, &stats, started);
            },
        )
    } else {
        let jobs = ThreadedDispatcher::with_worker_count(config.streaming.worker_threads);
        info!(workers = jobs.worker_count(), "Started generation workers");
        TerrainGrid::new(settings, jobs, RecordingSink::new()).map(|mut grid| {
            let stats = run(&mut grid, &path, ticks, true, |_| {});
            log_summary(&grid, &stats, started);
        })
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to create terrain grid: {e}");
            ExitCode::FAILURE
        }
    }
}
