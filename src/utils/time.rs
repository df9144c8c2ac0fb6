//! Time Utilities
//!
//! Frame pacing for the render loop.

use std::time::{Duration, Instant};

/// Number of recent frame times kept for FPS calculation
const FRAME_WINDOW: usize = 120;

/// Converts wall-clock ticks into elapsed time deltas.
///
/// The first tick after construction or a reset records a baseline and
/// reports zero elapsed, so a strip that sat idle does not jump forward on
/// its next frame.
pub struct FrameClock {
    last_tick: Option<Instant>,
    frame_times: Vec<Duration>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_tick: None,
            frame_times: Vec::with_capacity(FRAME_WINDOW),
        }
    }

    /// Mark a new frame and return the time elapsed since the previous one.
    ///
    /// Returns zero on the first call, and whenever `now` is earlier than
    /// the stored baseline; a non-monotonic clock must never produce
    /// negative scroll distance.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let delta = match self.last_tick {
            Some(last) => now.checked_duration_since(last).unwrap_or(Duration::ZERO),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);

        // Keep last FRAME_WINDOW frame times for FPS calculation
        self.frame_times.push(delta);
        if self.frame_times.len() > FRAME_WINDOW {
            self.frame_times.remove(0);
        }

        delta
    }

    /// Forget the baseline; the next tick reports zero elapsed.
    pub fn reset(&mut self) {
        self.last_tick = None;
        self.frame_times.clear();
    }

    /// Get current FPS based on recent frame times
    pub fn fps(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }

        let total: Duration = self.frame_times.iter().sum();
        let avg = total.as_secs_f32() / self.frame_times.len() as f32;

        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    /// Get average frame time in milliseconds
    pub fn avg_frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }

        let total: Duration = self.frame_times.iter().sum();
        total.as_secs_f32() * 1000.0 / self.frame_times.len() as f32
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
