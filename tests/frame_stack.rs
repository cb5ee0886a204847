//! Integration tests for nested frames and the thread-local framed-allocator
//! convenience layer (spec.md §4.2, §9).

use csdsa::Allocator;
use csdsa::frame::{close_global_frame, open_global_frame, with_framed_allocator};

#[test]
fn nested_frames_only_pop_their_own_pushes() {
    let mut alloc = Allocator::new(4096);

    alloc.open_frame();
    alloc.push(8);
    alloc.open_frame();
    alloc.push(8);
    alloc.push(8);
    alloc.close_frame();
    assert_eq!(alloc.open_frame_count(), 1);

    alloc.close_frame();
    assert!(alloc.is_fully_popped());
}

#[test]
#[should_panic(expected = "no open frame")]
fn closing_a_frame_twice_panics() {
    let mut alloc = Allocator::new(4096);
    alloc.open_frame();
    alloc.close_frame();
    alloc.close_frame();
}

#[test]
fn global_frame_convenience_round_trips() {
    let mut alloc = Allocator::new(4096);
    open_global_frame(&mut alloc);
    with_framed_allocator(|a| {
        a.push(16);
        a.push(16);
    });
    close_global_frame();
}
