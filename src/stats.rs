//! Allocation statistics counters.
//!
//! All counters use `Relaxed` ordering — they are observational only. This
//! crate is single-threaded by design (spec.md §5), so there is no ordering
//! guarantee to provide in the first place; atomics are used only so the
//! counters can live in a `static` without a lock, matching the teacher's
//! `stats` module shape.
//!
//! # Usage
//!
//! ```ignore
//! let snap = csdsa::stats::snapshot();
//! println!("regions created: {}", snap.regions_created);
//! ```
//!
//! Obtain a [`Snapshot`] with [`snapshot()`]. Only compiled in with the
//! `stats` feature; every counter is a no-op without it (see
//! [`crate::stat_inc`]).

use core::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct Stats {
    /// Times a new region was prepended to the chain.
    pub regions_created: AtomicU64,
    /// Times two empty adjacent regions were merged into one.
    pub regions_merged: AtomicU64,
    /// Total stack-discipline pushes.
    pub stack_pushes: AtomicU64,
    /// Total stack-discipline pops.
    pub stack_pops: AtomicU64,
    /// Total heap-discipline allocations (`heap_alloc`/`heap_realloc`).
    pub heap_allocs: AtomicU64,
    /// Total heap-discipline frees.
    pub heap_frees: AtomicU64,
    /// Total frames opened.
    pub frames_opened: AtomicU64,
    /// Total frames closed.
    pub frames_closed: AtomicU64,
    /// Total hash table rehashes.
    pub hashtable_rehashes: AtomicU64,
}

impl Stats {
    const fn new() -> Self {
        Self {
            regions_created: AtomicU64::new(0),
            regions_merged: AtomicU64::new(0),
            stack_pushes: AtomicU64::new(0),
            stack_pops: AtomicU64::new(0),
            heap_allocs: AtomicU64::new(0),
            heap_frees: AtomicU64::new(0),
            frames_opened: AtomicU64::new(0),
            frames_closed: AtomicU64::new(0),
            hashtable_rehashes: AtomicU64::new(0),
        }
    }
}

pub(crate) static STATS: Stats = Stats::new();

/// A point-in-time snapshot of all allocator/container statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct Snapshot {
    /// Times a new region was prepended to the chain.
    pub regions_created: u64,
    /// Times two empty adjacent regions were merged into one.
    pub regions_merged: u64,
    /// Total stack-discipline pushes.
    pub stack_pushes: u64,
    /// Total stack-discipline pops.
    pub stack_pops: u64,
    /// Total heap-discipline allocations (`heap_alloc`/`heap_realloc`).
    pub heap_allocs: u64,
    /// Total heap-discipline frees.
    pub heap_frees: u64,
    /// Total frames opened.
    pub frames_opened: u64,
    /// Total frames closed.
    pub frames_closed: u64,
    /// Total hash table rehashes.
    pub hashtable_rehashes: u64,
}

/// Load all counters with `Relaxed` ordering and return a [`Snapshot`].
pub fn snapshot() -> Snapshot {
    let s = &STATS;
    Snapshot {
        regions_created: s.regions_created.load(Ordering::Relaxed),
        regions_merged: s.regions_merged.load(Ordering::Relaxed),
        stack_pushes: s.stack_pushes.load(Ordering::Relaxed),
        stack_pops: s.stack_pops.load(Ordering::Relaxed),
        heap_allocs: s.heap_allocs.load(Ordering::Relaxed),
        heap_frees: s.heap_frees.load(Ordering::Relaxed),
        frames_opened: s.frames_opened.load(Ordering::Relaxed),
        frames_closed: s.frames_closed.load(Ordering::Relaxed),
        hashtable_rehashes: s.hashtable_rehashes.load(Ordering::Relaxed),
    }
}
