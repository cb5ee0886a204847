//! The region chain: an ordered chain of [`Region`]s with stack-discipline
//! push/pop, opportunistic merging, and a heap-discipline sub-interface.
//!
//! Grounded on the teacher's `page_heap.rs` (chain management, coalescing
//! free neighbours) and `span.rs` (linked metadata, raw-pointer traversal
//! under `SAFETY` comments).

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::frame::FrameStack;
use crate::region::Region;
use crate::{stat_add, stat_inc};

/// Default initial region size, matching the original library's
/// `STALLOC_DEFAULT`.
pub const DEFAULT_REGION_BYTES: usize = 1024;

/// The dual-mode region allocator: a region chain plus its frame stack.
///
/// `Allocator` is intentionally `!Sync` (it owns raw pointers with no
/// internal synchronization) — concurrent allocation is out of scope
/// (spec.md §1, §5).
pub struct Allocator {
    top: Box<Region>,
    frames: FrameStack,
}

impl Allocator {
    /// Create an allocator whose first region can address `initial_bytes`.
    pub fn new(initial_bytes: usize) -> Self {
        Self {
            top: Box::new(Region::new(initial_bytes)),
            frames: FrameStack::new(),
        }
    }

    /// Create an allocator using [`DEFAULT_REGION_BYTES`] as the initial
    /// region size.
    pub fn with_default_region() -> Self {
        Self::new(DEFAULT_REGION_BYTES)
    }

    /// Push `n` zero-filled bytes onto the stack discipline.
    ///
    /// Always succeeds: if the current top region cannot fit the (aligned,
    /// guard-bracketed) block, a larger region is prepended first
    /// (spec.md §4.1 growth policy). The returned address is 8-byte aligned
    /// and stable for the block's lifetime.
    pub fn push(&mut self, n: usize) -> NonNull<u8> {
        let ptr = match self.top.try_push(n) {
            Some((ptr, _)) => ptr,
            None => {
                self.grow_for(n);
                self.top
                    .try_push(n)
                    .expect("newly grown region must fit the requested block")
                    .0
            }
        };
        self.frames.record_push();
        stat_inc!(stack_pushes);
        ptr
    }

    /// Pop the topmost stack-discipline block.
    ///
    /// # Panics
    /// Panics if the allocator holds no live stack blocks, or if a guard
    /// word is corrupt (spec.md §7).
    pub fn pop(&mut self) {
        self.pop_one();
        self.frames.record_pop();
    }

    fn pop_one(&mut self) {
        let mut node: &mut Region = &mut self.top;
        loop {
            if !node.is_empty() {
                node.try_pop().expect("non-empty region must pop");
                break;
            }
            match node.next.as_mut() {
                Some(next) => node = next,
                None => panic!("pop called on an allocator with no live blocks"),
            }
        }
        stat_inc!(stack_pops);
        self.try_merge_top();
    }

    /// Open a new frame. Stack pushes made while this frame is innermost are
    /// charged to it and reclaimed in bulk by the matching `close_frame`.
    pub fn open_frame(&mut self) {
        self.frames.open();
    }

    /// Close the innermost open frame, popping every block it charged.
    ///
    /// # Panics
    /// Panics if no frame is open (spec.md §7: "double-close of a frame").
    pub fn close_frame(&mut self) {
        let charged = self.frames.close();
        for _ in 0..charged {
            self.pop_one();
        }
    }

    /// Depth of currently nested open frames. Exposed for tests.
    #[cfg(any(test, feature = "testing"))]
    pub fn open_frame_count(&self) -> usize {
        self.frames.depth()
    }

    /// Number of regions currently in the chain. Exposed for tests.
    #[cfg(any(test, feature = "testing"))]
    pub fn region_count(&self) -> usize {
        let mut count = 1;
        let mut cur = self.top.next.as_deref();
        while let Some(r) = cur {
            count += 1;
            cur = r.next.as_deref();
        }
        count
    }

    /// Capacity of the top region. Exposed for tests.
    #[cfg(any(test, feature = "testing"))]
    pub fn top_capacity(&self) -> usize {
        self.top.capacity()
    }

    /// Whether every region in the chain is currently empty.
    #[cfg(any(test, feature = "testing"))]
    pub fn is_fully_popped(&self) -> bool {
        let mut cur = Some(self.top.as_ref());
        while let Some(r) = cur {
            if !r.is_empty() {
                return false;
            }
            cur = r.next.as_deref();
        }
        true
    }

    /// Prepend a new top region large enough to fit `requested_payload`.
    fn grow_for(&mut self, requested_payload: usize) {
        let next_cap = Self::next_region_size(self.top.capacity(), requested_payload);
        let new_top = Box::new(Region::new(next_cap));
        let old_top = core::mem::replace(&mut self.top, new_top);
        self.top.next = Some(old_top);
        stat_inc!(regions_created);
    }

    /// Smallest region size that is at least double the current top's
    /// capacity *and* at least double the requested payload, while still
    /// guaranteeing the padded block actually fits — the original allocator
    /// doubles blindly and leaves alignment as a TODO (spec.md §9); since
    /// this implementation always aligns, it also guards against a tiny
    /// `current_top_cap` leaving no room for guard words and padding.
    fn next_region_size(current_top_cap: usize, requested_payload: usize) -> usize {
        let needed_for_fit =
            requested_payload + crate::guard::GUARD_SIZE * 2 + (crate::guard::ALIGNMENT - 1);
        let mut size = current_top_cap.max(1).saturating_mul(2);
        while size < requested_payload.saturating_mul(2) || size < needed_for_fit {
            size = size.saturating_mul(2);
        }
        size
    }

    /// After a pop, merge the top two regions if both are now empty. This is
    /// the only point other than allocator teardown where a region is
    /// destroyed (spec.md §4.1).
    fn try_merge_top(&mut self) {
        let should_merge = match self.top.next.as_deref() {
            Some(next) => self.top.is_empty() && next.is_empty(),
            None => false,
        };
        if !should_merge {
            return;
        }

        let mut second = self.top.next.take().expect("checked above");
        let merged_capacity = self.top.capacity() + second.capacity();
        let remainder = second.next.take();
        let mut merged = Box::new(Region::new(merged_capacity));
        merged.next = remainder;
        self.top = merged;
        stat_inc!(regions_merged);
    }

    /// Allocate `n` zero-filled bytes with random-lifetime (heap-discipline)
    /// semantics, aligned to `align`.
    ///
    /// Delegates to the process-global allocator, matching the original
    /// library's `halloc` (itself a thin wrapper over libc `calloc`). See
    /// DESIGN.md for the resolved "dual-ended region vs. delegate" open
    /// question (spec.md §9).
    pub fn heap_alloc(&self, n: usize, align: usize) -> NonNull<u8> {
        let layout = Self::byte_layout(n, align);
        // SAFETY: `layout` has non-zero size (`n > 0` asserted by `byte_layout`).
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        stat_inc!(heap_allocs);
        NonNull::new(ptr).unwrap_or_else(|| std::alloc::handle_alloc_error(layout))
    }

    /// Resize a heap-discipline allocation, preserving and zero-extending its
    /// contents. Works only for pointers obtained from [`Self::heap_alloc`]
    /// or a prior `heap_realloc` — mixing stack- and heap-discipline
    /// pointers on the same call is undefined (spec.md §4.1).
    pub fn heap_realloc(
        &self,
        ptr: NonNull<u8>,
        old_n: usize,
        new_n: usize,
        align: usize,
    ) -> NonNull<u8> {
        let old_layout = Self::byte_layout(old_n, align);
        // SAFETY: `ptr` was allocated with `old_layout` by this module's
        // heap-discipline functions; `new_n` is at least 1 (enforced below).
        let raw = unsafe { std::alloc::realloc(ptr.as_ptr(), old_layout, new_n.max(1)) };
        let new_ptr = NonNull::new(raw)
            .unwrap_or_else(|| std::alloc::handle_alloc_error(Self::byte_layout(new_n, align)));
        if new_n > old_n {
            // SAFETY: `new_ptr` owns `new_n` bytes; `old_n..new_n` is in bounds.
            unsafe {
                core::ptr::write_bytes(new_ptr.as_ptr().add(old_n), 0, new_n - old_n);
            }
        }
        stat_add!(heap_allocs, 1u64);
        new_ptr
    }

    /// Free a heap-discipline allocation of `n` bytes.
    pub fn heap_free(&self, ptr: NonNull<u8>, n: usize, align: usize) {
        let layout = Self::byte_layout(n, align);
        // SAFETY: `ptr` was allocated with this exact layout by `heap_alloc`/
        // `heap_realloc` above.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        stat_inc!(heap_frees);
    }

    fn byte_layout(n: usize, align: usize) -> Layout {
        assert!(n > 0, "heap-discipline size must be positive");
        Layout::from_size_align(n, align).expect("invalid heap-discipline layout")
    }
}
