//! Frame counters for the router
//!
//! Lock-free atomics; readable from any thread while the router runs.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct RouterStats {
    frames_in: AtomicU64,
    frames_out: AtomicU64,
    mismatched: AtomicU64,
    evicted: AtomicU64,
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_in(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_out(&self) {
        self.frames_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Frame discarded for an unexpected type or tag
    #[inline]
    pub fn add_mismatch(&self) {
        self.mismatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Frame dropped by a full queue
    #[inline]
    pub fn add_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_in(&self) -> u64 {
        self.frames_in.load(Ordering::Relaxed)
    }

    pub fn frames_out(&self) -> u64 {
        self.frames_out.load(Ordering::Relaxed)
    }

    pub fn mismatched(&self) -> u64 {
        self.mismatched.load(Ordering::Relaxed)
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}
