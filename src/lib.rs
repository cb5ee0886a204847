//! csdsa: a dual-mode region allocator and generic container substrate.
//!
//! The allocator ([`allocator::Allocator`]) manages one chain of memory
//! [`region::Region`]s and supports two allocation disciplines over it:
//!
//! - **Stack discipline** — scoped, LIFO blocks guarded on both sides by a
//!   [`guard`] word, reclaimed either one at a time (`pop`) or in bulk via
//!   nested [`frame`] scopes.
//! - **Heap discipline** — ordinary random-lifetime allocations, delegated
//!   to the process allocator.
//!
//! [`sequence::Sequence`] and [`hashtable::HashTable`] are generic
//! containers built on top of either discipline, chosen per-container via
//! [`placement::Placement`].
//!
//! ```
//! use csdsa::{allocator::Allocator, placement::Placement, sequence::Sequence};
//!
//! let mut alloc = Allocator::with_default_region();
//! let mut seq: Sequence<i32> = Sequence::init(&mut alloc, Placement::Stack, 4);
//! seq.push(1);
//! seq.push(2);
//! assert_eq!(seq.len(), 2);
//! ```

pub mod allocator;
pub mod frame;
pub mod guard;
pub mod hashtable;
mod macros;
pub mod placement;
pub mod region;
pub mod sequence;
#[cfg(feature = "stats")]
pub mod stats;
pub mod util;

pub use allocator::Allocator;
pub use hashtable::HashTable;
pub use placement::Placement;
pub use sequence::Sequence;
