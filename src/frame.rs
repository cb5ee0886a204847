//! The frame stack: a lifetime-scoping layer above [`crate::allocator::Allocator`].
//!
//! Each open frame counts how many stack-discipline pushes happened while it
//! was the innermost open frame; closing a frame pops exactly that many
//! blocks in bulk. Frames nest LIFO.

use core::cell::Cell;
use core::ptr::NonNull;

use crate::allocator::Allocator;
use crate::stat_inc;

/// Per-allocator frame bookkeeping: one push counter per open frame.
///
/// Lives as a field on [`Allocator`] rather than as a type callers interact
/// with directly — `open_frame`/`close_frame` are inherent methods on
/// `Allocator` that delegate here, mirroring the original C library's single
/// `stalloc` struct that embeds both the region chain and the frame array.
#[derive(Default)]
pub(crate) struct FrameStack {
    counts: Vec<u64>,
}

impl FrameStack {
    pub(crate) fn new() -> Self {
        Self { counts: Vec::new() }
    }

    pub(crate) fn open(&mut self) {
        self.counts.push(0);
        stat_inc!(frames_opened);
    }

    pub(crate) fn record_push(&mut self) {
        if let Some(c) = self.counts.last_mut() {
            *c += 1;
        }
    }

    pub(crate) fn record_pop(&mut self) {
        if let Some(c) = self.counts.last_mut() {
            *c -= 1;
        }
    }

    /// Close the innermost frame, returning the number of blocks it charged.
    ///
    /// # Panics
    /// Panics if no frame is open (spec.md §7: double-close is a
    /// programming error).
    pub(crate) fn close(&mut self) -> u64 {
        stat_inc!(frames_closed);
        self.counts
            .pop()
            .expect("close_frame called with no open frame")
    }

    pub(crate) fn depth(&self) -> usize {
        self.counts.len()
    }
}

thread_local! {
    /// The process-wide (here: thread-local) "framed allocator" pointer.
    ///
    /// Set for exactly the duration of one top-level global frame; at most
    /// one is active per thread at a time (spec.md §4.2, §5, §9). A
    /// thread-local is used instead of a single global `static` so the
    /// convenience layer cannot become a cross-thread concurrency hazard —
    /// concurrent allocation is explicitly out of scope (spec.md §1).
    static FRAMED_ALLOCATOR: Cell<Option<NonNull<Allocator>>> = const { Cell::new(None) };
}

/// Register `alloc` as this thread's framed allocator and open a frame on it.
///
/// # Panics
/// Panics if a global frame is already open on this thread.
pub fn open_global_frame(alloc: &mut Allocator) {
    FRAMED_ALLOCATOR.with(|cell| {
        assert!(
            cell.get().is_none(),
            "a global frame is already open on this thread"
        );
        cell.set(Some(NonNull::from(&mut *alloc)));
    });
    alloc.open_frame();
}

/// Close this thread's global frame and clear the framed-allocator pointer.
///
/// # Panics
/// Panics if no global frame is open on this thread.
pub fn close_global_frame() {
    FRAMED_ALLOCATOR.with(|cell| {
        let ptr = cell
            .get()
            .expect("no global frame is open on this thread");
        // SAFETY: `ptr` was registered by `open_global_frame` from a live
        // `&mut Allocator` that the caller still owns; the global frame
        // contract requires that allocator to outlive the frame.
        unsafe { (*ptr.as_ptr()).close_frame() };
        cell.set(None);
    });
}

/// Run `f` against this thread's framed allocator.
///
/// This is the convenience path that lets containers be constructed without
/// naming an allocator explicitly (spec.md §4.2).
///
/// # Panics
/// Panics if no global frame is open on this thread.
pub fn with_framed_allocator<R>(f: impl FnOnce(&mut Allocator) -> R) -> R {
    FRAMED_ALLOCATOR.with(|cell| {
        let ptr = cell
            .get()
            .expect("no global frame is open on this thread");
        // SAFETY: see `close_global_frame`.
        unsafe { f(&mut *ptr.as_ptr()) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_accounts_pushes_to_innermost_frame() {
        let mut frames = FrameStack::new();
        frames.open();
        frames.record_push();
        frames.open();
        frames.record_push();
        frames.record_push();
        assert_eq!(frames.close(), 2);
        assert_eq!(frames.close(), 1);
        assert_eq!(frames.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "no open frame")]
    fn close_without_open_panics() {
        let mut frames = FrameStack::new();
        frames.close();
    }

    #[test]
    fn global_frame_round_trip() {
        let mut alloc = Allocator::new(1024);
        open_global_frame(&mut alloc);
        with_framed_allocator(|a| {
            a.push(8);
        });
        close_global_frame();
    }

    #[test]
    #[should_panic(expected = "already open")]
    fn double_open_panics() {
        let mut a1 = Allocator::new(1024);
        let mut a2 = Allocator::new(1024);
        open_global_frame(&mut a1);
        open_global_frame(&mut a2);
    }
}
