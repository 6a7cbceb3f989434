//! Fixed-timestep clock for grid ticks.
//!
//! The grid is ticked at 60 Hz and the viewer path is sampled at the
//! simulation time of each tick, so a run walks the same path whether it
//! follows the wall clock or spins as fast as possible.

use std::time::Instant;
use tracing::warn;

/// Fixed simulation timestep: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Longest frame time fed into the accumulator. Longer frames are clamped
/// and the walk falls behind wall-clock time.
pub const MAX_FRAME_TIME: f64 = 0.25;

pub struct GameLoop {
    previous_time: Instant,
    accumulator: f64,
    sim_time: f64,
}

impl GameLoop {
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            accumulator: 0.0,
            sim_time: 0.0,
        }
    }

    /// Measures wall-clock time since the previous call and runs the grid
    /// ticks it covers. Returns how many ticks ran.
    pub fn tick(&mut self, step: impl FnMut(f64)) -> u32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time, step)
    }

    /// Runs the grid ticks covered by `frame_time` seconds, passing each
    /// one the simulation time it starts at.
    pub fn advance(&mut self, mut frame_time: f64, mut step: impl FnMut(f64)) -> u32 {
        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
        }

        self.accumulator += frame_time;

        let mut ticks = 0;
        while self.accumulator >= FIXED_DT {
            step(self.sim_time);
            self.sim_time += FIXED_DT;
            self.accumulator -= FIXED_DT;
            ticks += 1;
        }
        ticks
    }
}
