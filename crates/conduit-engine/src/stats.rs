//! Debug counters
//!
//! Process-wide and monotonic. Tests compare snapshots taken before and
//! after a sequence of calls.

use std::sync::atomic::{AtomicU64, Ordering};

static BUFFERS_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static BUFFERS_RELEASED: AtomicU64 = AtomicU64::new(0);
static CALLBACKS: AtomicU64 = AtomicU64::new(0);
static ERRORS_RECORDED: AtomicU64 = AtomicU64::new(0);
static ERRORS_TAKEN: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub buffers_allocated: u64,
    pub buffers_released: u64,
    pub callbacks: u64,
    pub errors_recorded: u64,
    pub errors_taken: u64,
}

impl Stats {
    /// Buffers handed out and not yet released
    pub fn live_buffers(&self) -> u64 {
        self.buffers_allocated.saturating_sub(self.buffers_released)
    }

    /// Counter deltas since `earlier`
    pub fn since(&self, earlier: &Stats) -> Stats {
        Stats {
            buffers_allocated: self.buffers_allocated - earlier.buffers_allocated,
            buffers_released: self.buffers_released - earlier.buffers_released,
            callbacks: self.callbacks - earlier.callbacks,
            errors_recorded: self.errors_recorded - earlier.errors_recorded,
            errors_taken: self.errors_taken - earlier.errors_taken,
        }
    }
}

pub fn stats() -> Stats {
    Stats {
        buffers_allocated: BUFFERS_ALLOCATED.load(Ordering::SeqCst),
        buffers_released: BUFFERS_RELEASED.load(Ordering::SeqCst),
        callbacks: CALLBACKS.load(Ordering::SeqCst),
        errors_recorded: ERRORS_RECORDED.load(Ordering::SeqCst),
        errors_taken: ERRORS_TAKEN.load(Ordering::SeqCst),
    }
}

pub(crate) fn buffer_allocated() {
    BUFFERS_ALLOCATED.fetch_add(1, Ordering::SeqCst);
}

pub(crate) fn buffer_released() {
    BUFFERS_RELEASED.fetch_add(1, Ordering::SeqCst);
}

pub(crate) fn callback_fired() {
    CALLBACKS.fetch_add(1, Ordering::SeqCst);
}

pub(crate) fn error_recorded() {
    ERRORS_RECORDED.fetch_add(1, Ordering::SeqCst);
}

pub(crate) fn error_taken() {
    ERRORS_TAKEN.fetch_add(1, Ordering::SeqCst);
}
