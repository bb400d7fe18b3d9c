//! Frame timing.
//!
//! [`StepTimer`] measures wall-clock time between ticks and runs the update
//! callback either once per tick (variable step) or as many times as whole
//! fixed steps have accumulated (fixed step).

use instant::{Duration, Instant};

/// Deltas longer than this are clamped, e.g. after a breakpoint.
const MAX_DELTA: Duration = Duration::from_millis(100);

/// Deltas this close to the fixed target snap to it to avoid slow drift
/// from a vsync-locked clock.
const SNAP_TOLERANCE: Duration = Duration::from_micros(250);

#[derive(Debug, Clone)]
pub struct StepTimer {
    last_time: Instant,
    max_delta: Duration,

    elapsed: Duration,
    total: Duration,
    left_over: Duration,

    frame_count: u32,
    frames_per_second: u32,
    frames_this_second: u32,
    second_counter: Duration,

    target_elapsed: Option<Duration>,
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepTimer {
    pub fn new() -> Self {
        Self {
            last_time: Instant::now(),
            max_delta: MAX_DELTA,
            elapsed: Duration::ZERO,
            total: Duration::ZERO,
            left_over: Duration::ZERO,
            frame_count: 0,
            frames_per_second: 0,
            frames_this_second: 0,
            second_counter: Duration::ZERO,
            target_elapsed: None,
        }
    }

    /// Switch to fixed steps of `target`; `None` goes back to variable steps.
    pub fn set_fixed_time_step(&mut self, target: Option<Duration>) {
        self.target_elapsed = target.filter(|t| !t.is_zero());
    }

    pub fn is_fixed_time_step(&self) -> bool {
        self.target_elapsed.is_some()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn total_seconds(&self) -> f32 {
        self.total.as_secs_f32()
    }

    /// Number of updates run since construction.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    /// Forget the time since the last tick. Call after a long intentional
    /// pause (suspend, blocking load) so the next tick does not try to
    /// catch up.
    pub fn reset_elapsed_time(&mut self) {
        self.last_time = Instant::now();
        self.left_over = Duration::ZERO;
        self.frames_per_second = 0;
        self.frames_this_second = 0;
        self.second_counter = Duration::ZERO;
    }

    pub fn tick<F: FnMut(&StepTimer)>(&mut self, update: F) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_time);
        self.last_time = now;
        self.advance(delta, update);
    }

    /// Advance by an explicit `delta` instead of reading the clock.
    pub fn advance<F: FnMut(&StepTimer)>(&mut self, delta: Duration, mut update: F) {
        self.second_counter += delta;
        let mut delta = delta.min(self.max_delta);
        let last_frame_count = self.frame_count;

        match self.target_elapsed {
            Some(target) => {
                if delta.abs_diff(target) < SNAP_TOLERANCE {
                    delta = target;
                }
                self.left_over += delta;
                while self.left_over >= target {
                    self.elapsed = target;
                    self.total += target;
                    self.left_over -= target;
                    self.frame_count += 1;
                    update(&*self);
                }
            }
            None => {
                self.elapsed = delta;
                self.total += delta;
                self.left_over = Duration::ZERO;
                self.frame_count += 1;
                update(&*self);
            }
        }

        if self.frame_count != last_frame_count {
            self.frames_this_second += 1;
        }
        if self.second_counter >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_this_second;
            self.frames_this_second = 0;
            self.second_counter = Duration::from_nanos(
                (self.second_counter.as_nanos() % Duration::from_secs(1).as_nanos()) as u64,
            );
        }
    }
}
