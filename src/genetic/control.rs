//! Cooperative stop points for a running solve.
//!
//! The solver consults its [`Checkpoint`] before every restart attempt and
//! every generation. Whether a `Continue` means "keep going on this thread"
//! or "resume on the next tick" is up to whoever drives the solver.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Snapshot handed to a checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Generations executed so far
    pub generation: usize,
    /// Starting populations drawn so far
    pub attempts: usize,
    /// Best score so far, infinite before the first valid population
    pub best_score: f64,
}

pub trait Checkpoint {
    /// `Break` aborts the solve with a cancellation
    fn check(&mut self, progress: &Progress) -> ControlFlow<()>;
}

impl<C: Checkpoint + ?Sized> Checkpoint for Box<C> {
    fn check(&mut self, progress: &Progress) -> ControlFlow<()> {
        (**self).check(progress)
    }
}

/// Never stops
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl Checkpoint for Unbounded {
    #[inline]
    fn check(&mut self, _progress: &Progress) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Shared flag another thread can raise to stop the solve
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Checkpoint for CancellationToken {
    fn check(&mut self, _progress: &Progress) -> ControlFlow<()> {
        if self.is_cancelled() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Wall-clock limit, counted from construction
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn new(limit: Duration) -> Self {
        Deadline {
            start: Instant::now(),
            limit,
        }
    }

    pub fn after_secs(seconds: f64) -> Self {
        Self::new(Duration::from_secs_f64(seconds.max(0.0)))
    }

    pub fn is_expired(&self) -> bool {
        self.start.elapsed() >= self.limit
    }
}

impl Checkpoint for Deadline {
    fn check(&mut self, _progress: &Progress) -> ControlFlow<()> {
        if self.is_expired() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
