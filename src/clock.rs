//! Timing and the stop condition for the sampling loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Source of the blocking delay between samples.
pub trait Clock {
    /// Block for the given period.
    fn sleep(&mut self, period: Duration);
}

/// Wall clock; sleeps the calling thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, period: Duration) {
        thread::sleep(period);
    }
}

/// Shared request to stop the sampling loop, checked once per iteration.
#[derive(Clone, Debug, Default)]
pub struct StopFlag {
    requested: Arc<AtomicBool>,
}

impl StopFlag {
    /// Create a flag with no stop requested.
    pub fn new() -> StopFlag {
        StopFlag::default()
    }

    /// Ask the loop to stop before its next iteration.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Returns true once a stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
