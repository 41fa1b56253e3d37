//! Process-wide logical modification clock.
//!
//! Every stateful object (nodes, data objects) stamps itself from one
//! monotonically increasing counter, so "older than" comparisons between
//! unrelated objects are meaningful without wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_CLOCK: AtomicU64 = AtomicU64::new(0);

/// Advance the global clock and return the new value.
#[inline]
pub fn next_mtime() -> u64 {
    GLOBAL_CLOCK.fetch_add(1, Ordering::Relaxed) + 1
}

/// Latest value handed out by [`next_mtime`].
#[inline]
pub fn current_mtime() -> u64 {
    GLOBAL_CLOCK.load(Ordering::Relaxed)
}

/// A modification timestamp. Zero means "never modified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeStamp(u64);

impl TimeStamp {
    /// A stamp that has already been marked modified.
    pub fn new() -> Self {
        let mut stamp = Self::default();
        stamp.modified();
        stamp
    }

    /// Take a fresh value from the global clock.
    #[inline]
    pub fn modified(&mut self) {
        self.0 = next_mtime();
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}
