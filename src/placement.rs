//! The placement flag shared by every container: where its backing bytes
//! come from, and therefore how they are released.

/// Selects which allocator discipline backs a container's storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Backed by a stack-discipline block. Never freed individually — the
    /// enclosing frame reclaims it in bulk on `close_frame`.
    Stack,
    /// Backed by a heap-discipline allocation with random-lifetime
    /// semantics. Released on drop (or an explicit `free`).
    Heap,
}
