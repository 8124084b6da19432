//! Wall-clock timing for simulation runs.
//!
//! `Timer` measures how long a solve took for log lines. `Deadline` is the
//! cooperative timeout the engine loop polls between steps.

use std::time::{Duration, Instant};

/// A simple timer that measures elapsed time.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed time in seconds, timer keeps running.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer and return elapsed time in seconds.
    pub fn stop(self) -> f64 {
        self.elapsed_s()
    }
}

/// Point in time after which a run must give up.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// Deadline `limit` from now; `None` never expires.
    pub fn after(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn never() -> Self {
        Self::after(None)
    }

    pub fn expired(&self) -> bool {
        match self.limit {
            Some(limit) => self.started.elapsed() >= limit,
            None => false,
        }
    }

    pub fn elapsed_s(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
