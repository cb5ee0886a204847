//! Open-addressing hash table with linear probing and generation-tagged
//! O(1) clear.
//!
//! Grounded on the original library's `map.c`: each slot stores a key, a
//! value, and a `state` word; `state == in_use_id` means occupied, any other
//! value means free or tombstoned. `clear` bumps `in_use_id` instead of
//! rewriting every slot, so a full table can be emptied in constant time
//! (spec.md §4.4). Keys are compared by raw bytes via [`crate::util`], never
//! through `core::cmp::PartialEq`, so hashing and equality are guaranteed to
//! agree bit-for-bit.

use core::marker::PhantomData;
use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use crate::allocator::Allocator;
use crate::placement::Placement;
use crate::sequence::Sequence;
use crate::stat_inc;
use crate::util::hash_bytes;

/// Resize threshold: a rehash-doubling triggers once occupancy reaches this
/// fraction of capacity (spec.md §4.4), matching the original's
/// `MAP_LOAD_FACTOR`.
pub const LOAD_FACTOR: f32 = 0.75;

const FREE_STATE: u32 = 0;

/// The raw `[key][value][state]` layout of one table slot, occupied or not.
///
/// Exposed only via [`HashTable::to_sequence`] as a thin dump of the
/// table's internal layout (matching the original library's `map_to_vec`) —
/// most callers want [`HashTable::foreach`]/[`HashTable::get`] instead,
/// which already filter to occupied entries.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct RawSlot<K, V> {
    pub key: K,
    pub value: V,
    pub state: u32,
}

type Slot<K, V> = RawSlot<K, V>;

/// An open-addressing hash table mapping `K` to `V`.
///
/// As with [`crate::sequence::Sequence`], this holds a raw pointer to its
/// allocator rather than a borrow, so sibling containers can share one
/// allocator under the discipline described in spec.md §5.
pub struct HashTable<K, V> {
    allocator: NonNull<Allocator>,
    placement: Placement,
    slots: NonNull<Slot<K, V>>,
    /// Table size in slots (distinct from `slots_in_use`).
    capacity: usize,
    slots_in_use: usize,
    /// The state value that marks a slot occupied. Bumped by `clear`
    /// instead of rewriting every slot.
    in_use_id: u32,
    /// Persists across rehashes; exposed via [`Self::generation`] for
    /// callers that want to detect "has this table been rehashed or
    /// cleared since I last looked" (original library's `cache_counter`).
    cache_counter: u32,
    _marker: PhantomData<(K, V)>,
}

/// A borrowed key/value pair read out of an occupied slot.
pub struct Entry<'a, K, V> {
    pub key: &'a K,
    pub value: &'a V,
}

impl<K, V> HashTable<K, V> {
    /// # Safety
    /// The caller must ensure the allocator this table was built on is still
    /// alive and not mutably aliased for the duration of the call.
    unsafe fn allocator_mut(&self) -> &mut Allocator {
        // SAFETY: forwarded from the caller; see struct-level docs.
        unsafe { &mut *self.allocator.as_ptr() }
    }

    fn alloc_slots(&self, count: usize) -> NonNull<Slot<K, V>> {
        let bytes = count * size_of::<Slot<K, V>>();
        // SAFETY: `self.allocator` is live for the duration of this call.
        let raw = unsafe {
            match self.placement {
                Placement::Stack => self.allocator_mut().push(bytes),
                Placement::Heap => self
                    .allocator_mut()
                    .heap_alloc(bytes, align_of::<Slot<K, V>>()),
            }
        };
        raw.cast()
    }

    fn free_slots_if_heap(&self, capacity: usize) {
        if self.placement == Placement::Heap {
            let bytes = capacity * size_of::<Slot<K, V>>();
            // SAFETY: `self.slots` with `capacity` slots was allocated by
            // `alloc_slots` under `Placement::Heap`.
            unsafe {
                self.allocator_mut()
                    .heap_free(self.slots.cast(), bytes, align_of::<Slot<K, V>>());
            }
        }
    }

    /// Number of occupied slots.
    pub fn load(&self) -> usize {
        self.slots_in_use
    }

    /// Table size in slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Monotonically increasing counter bumped on every clear or rehash.
    pub fn generation(&self) -> u32 {
        self.cache_counter
    }
}

impl<K: Copy, V: Copy> HashTable<K, V> {
    /// Construct a table with `initial_capacity` slots backed by `alloc`
    /// under the given placement.
    ///
    /// # Panics
    /// Panics if `initial_capacity == 0`.
    pub fn init(alloc: &mut Allocator, placement: Placement, initial_capacity: usize) -> Self {
        assert!(initial_capacity >= 1, "initial_capacity must be >= 1");
        let mut table = Self {
            allocator: NonNull::from(&mut *alloc),
            placement,
            slots: NonNull::dangling(),
            capacity: initial_capacity,
            slots_in_use: 0,
            in_use_id: 1,
            cache_counter: 0,
            _marker: PhantomData,
        };
        table.slots = table.alloc_slots(initial_capacity);
        table.zero_slots();
        table
    }

    fn zero_slots(&mut self) {
        // SAFETY: `capacity` slots are owned by this table.
        unsafe {
            core::ptr::write_bytes(self.slots.as_ptr(), 0, self.capacity);
        }
    }

    fn slot(&self, i: usize) -> &Slot<K, V> {
        // SAFETY: `i < capacity`, enforced by every caller.
        unsafe { &*self.slots.as_ptr().add(i) }
    }

    fn slot_mut(&mut self, i: usize) -> &mut Slot<K, V> {
        // SAFETY: `i < capacity`, enforced by every caller.
        unsafe { &mut *self.slots.as_ptr().add(i) }
    }

    fn is_occupied(&self, i: usize) -> bool {
        self.slot(i).state == self.in_use_id
    }

    fn key_bytes(key: &K) -> &[u8] {
        // SAFETY: `K: Copy` carries no destructor; reading its raw bytes for
        // hashing/equality is well-defined (spec.md §9).
        unsafe { core::slice::from_raw_parts((key as *const K).cast::<u8>(), size_of::<K>()) }
    }

    fn hash_of(key: &K) -> u64 {
        hash_bytes(Self::key_bytes(key))
    }

    /// Index of the occupied slot holding `key`, via forward linear probe
    /// with wraparound, or `None` if absent.
    fn key_pos(&self, key: &K) -> Option<usize> {
        let start = (Self::hash_of(key) % self.capacity as u64) as usize;
        let target = Self::key_bytes(key);
        for idx in start..self.capacity {
            if self.is_occupied(idx) && Self::key_bytes(&self.slot(idx).key) == target {
                return Some(idx);
            }
        }
        for idx in 0..start {
            if self.is_occupied(idx) && Self::key_bytes(&self.slot(idx).key) == target {
                return Some(idx);
            }
        }
        None
    }

    /// Index of the first free (or tombstoned) slot starting at `from`, with
    /// wraparound.
    ///
    /// # Panics
    /// Panics if every slot is occupied — callers must maintain the load
    /// factor before calling this (spec.md §4.4).
    fn linear_search_open_pos(&self, from: usize) -> usize {
        for idx in from..self.capacity {
            if !self.is_occupied(idx) {
                return idx;
            }
        }
        for idx in 0..from {
            if !self.is_occupied(idx) {
                return idx;
            }
        }
        panic!("hash table is full, this should never happen");
    }

    fn maintain_load_factor(&mut self) {
        let lf = self.slots_in_use as f32 / self.capacity as f32;
        if lf < LOAD_FACTOR {
            return;
        }
        let next_cache_counter = self.cache_counter + 1;
        // `Self::init` always starts a fresh table's generation at 1; the
        // rehashed table must keep the pre-rehash generation instead
        // (spec.md §4.4: "the generation is preserved across rehashes"), so
        // it's captured here and written into `grown` before any slot is
        // written, not copied out afterwards.
        let preserved_in_use_id = self.in_use_id;

        // SAFETY: `allocator_mut` is valid per the struct-level contract;
        // `grown` is built on the same allocator and placement as `self`.
        let alloc = unsafe { self.allocator_mut() };
        let mut grown = Self::init(alloc, self.placement, self.capacity * 2);
        grown.in_use_id = preserved_in_use_id;

        for idx in 0..self.capacity {
            if self.is_occupied(idx) {
                let s = self.slot(idx);
                grown.put(s.key, s.value);
            }
        }

        self.free_slots_if_heap(self.capacity);
        self.slots = grown.slots;
        self.capacity = grown.capacity;
        self.slots_in_use = grown.slots_in_use;
        self.in_use_id = grown.in_use_id;
        self.cache_counter = next_cache_counter;
        core::mem::forget(grown);
        stat_inc!(hashtable_rehashes);
    }

    /// Insert or overwrite the value for `key`.
    pub fn put(&mut self, key: K, value: V) {
        self.maintain_load_factor();
        if self.has(&key) {
            self.del(&key);
        }
        let start = (Self::hash_of(&key) % self.capacity as u64) as usize;
        let idx = self.linear_search_open_pos(start);
        let in_use_id = self.in_use_id;
        let slot = self.slot_mut(idx);
        slot.key = key;
        slot.value = value;
        slot.state = in_use_id;
        self.slots_in_use += 1;
    }

    /// Look up `key`.
    pub fn get(&self, key: &K) -> Option<Entry<'_, K, V>> {
        let idx = self.key_pos(key)?;
        let s = self.slot(idx);
        Some(Entry {
            key: &s.key,
            value: &s.value,
        })
    }

    pub fn has(&self, key: &K) -> bool {
        self.key_pos(key).is_some()
    }

    /// Remove `key`, if present.
    pub fn del(&mut self, key: &K) {
        if let Some(idx) = self.key_pos(key) {
            self.slot_mut(idx).state = FREE_STATE;
            self.slots_in_use -= 1;
        }
    }

    /// Drop every entry and bump the generation, without touching capacity.
    pub fn clear(&mut self) {
        self.in_use_id += 1;
        self.slots_in_use = 0;
        self.cache_counter += 1;
    }

    /// Apply `f` to every occupied entry.
    pub fn foreach(&self, mut f: impl FnMut(Entry<'_, K, V>)) {
        for idx in 0..self.capacity {
            if self.is_occupied(idx) {
                let s = self.slot(idx);
                f(Entry {
                    key: &s.key,
                    value: &s.value,
                });
            }
        }
    }

    /// Count occupied entries satisfying `p`.
    pub fn count_if(&self, p: impl Fn(Entry<'_, K, V>) -> bool) -> usize {
        let mut count = 0;
        for idx in 0..self.capacity {
            if self.is_occupied(idx) {
                let s = self.slot(idx);
                if p(Entry {
                    key: &s.key,
                    value: &s.value,
                }) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Return the first occupied entry satisfying `p`, if any.
    pub fn find_one(&self, p: impl Fn(Entry<'_, K, V>) -> bool) -> Option<(K, V)> {
        for idx in 0..self.capacity {
            if self.is_occupied(idx) {
                let s = self.slot(idx);
                if p(Entry {
                    key: &s.key,
                    value: &s.value,
                }) {
                    return Some((s.key, s.value));
                }
            }
        }
        None
    }

    /// Dump every occupied slot's raw `[key][value][state]` layout into a
    /// freshly built [`Sequence`], in slot order.
    ///
    /// This is a thin convenience mirroring the original library's
    /// `map_to_vec`: it exports raw slots, including the `state` word, not
    /// user-facing key/value pairs. Prefer [`Self::foreach`] or
    /// [`Self::get`] unless the raw layout is specifically what's needed.
    pub fn to_sequence(&self, alloc: &mut Allocator, placement: Placement) -> Sequence<RawSlot<K, V>> {
        let mut out = Sequence::init(alloc, placement, self.slots_in_use.max(1));
        for idx in 0..self.capacity {
            if self.is_occupied(idx) {
                out.push(*self.slot(idx));
            }
        }
        out
    }

    /// Replace the contents with the subset of entries satisfying `p`.
    /// Mirrors [`crate::sequence::Sequence::filter`]: the result keeps
    /// `self`'s own placement rather than the original library's apparent
    /// quirk of always placing the filtered copy on the stack (see
    /// DESIGN.md).
    pub fn filter(&mut self, p: impl Fn(Entry<'_, K, V>) -> bool) -> &mut Self {
        // SAFETY: `allocator_mut` is valid per the struct-level contract;
        // `kept` is built on the same allocator and placement as `self`.
        let alloc = unsafe { self.allocator_mut() };
        let mut kept = Self::init(alloc, self.placement, self.capacity);

        for idx in 0..self.capacity {
            if self.is_occupied(idx) {
                let s = self.slot(idx);
                let entry = Entry {
                    key: &s.key,
                    value: &s.value,
                };
                if p(entry) {
                    kept.put(s.key, s.value);
                }
            }
        }

        self.free_slots_if_heap(self.capacity);
        self.slots = kept.slots;
        self.capacity = kept.capacity;
        self.slots_in_use = kept.slots_in_use;
        self.in_use_id = kept.in_use_id;
        self.cache_counter = kept.cache_counter;
        core::mem::forget(kept);
        self
    }
}

impl<K, V> Drop for HashTable<K, V> {
    fn drop(&mut self) {
        self.free_slots_if_heap(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Allocator;

    #[test]
    fn get_after_put_round_trips() {
        let mut alloc = Allocator::new(8192);
        let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Stack, 8);
        table.put(1, 100);
        table.put(2, 200);
        assert_eq!(table.get(&1).map(|e| *e.value), Some(100));
        assert_eq!(table.get(&2).map(|e| *e.value), Some(200));
        assert!(table.get(&3).is_none());
    }

    #[test]
    fn rehash_preserves_generation_across_clears() {
        let mut alloc = Allocator::new(1 << 16);
        let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Heap, 4);
        table.clear();
        table.clear();
        let in_use_id_before = table.in_use_id;
        for i in 0..20i32 {
            table.put(i, i);
        }
        assert!(table.capacity() > 4, "rehash should have occurred");
        assert_eq!(table.in_use_id, in_use_id_before);
        for i in 0..20i32 {
            assert_eq!(table.get(&i).map(|e| *e.value), Some(i));
        }
    }

    #[test]
    fn delete_after_put_removes_entry() {
        let mut alloc = Allocator::new(8192);
        let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Heap, 8);
        table.put(5, 50);
        assert!(table.has(&5));
        table.del(&5);
        assert!(!table.has(&5));
        assert_eq!(table.load(), 0);
    }

    #[test]
    fn put_is_idempotent_on_same_key() {
        let mut alloc = Allocator::new(8192);
        let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Stack, 8);
        table.put(9, 1);
        table.put(9, 2);
        table.put(9, 3);
        assert_eq!(table.load(), 1);
        assert_eq!(table.get(&9).map(|e| *e.value), Some(3));
    }

    #[test]
    fn rehash_doubles_and_preserves_entries() {
        let mut alloc = Allocator::new(1 << 16);
        let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Heap, 4);
        for i in 0..20i32 {
            table.put(i, i * 10);
        }
        assert!(table.capacity() > 4);
        for i in 0..20i32 {
            assert_eq!(table.get(&i).map(|e| *e.value), Some(i * 10));
        }
    }

    #[test]
    fn clear_drops_entries_without_shrinking_capacity() {
        let mut alloc = Allocator::new(8192);
        let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Stack, 8);
        table.put(1, 1);
        table.put(2, 2);
        let capacity_before = table.capacity();
        table.clear();
        assert_eq!(table.load(), 0);
        assert_eq!(table.capacity(), capacity_before);
        assert!(!table.has(&1));
    }

    #[test]
    fn to_sequence_dumps_occupied_slots() {
        let mut alloc = Allocator::new(1 << 16);
        let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Stack, 8);
        table.put(1, 10);
        table.put(2, 20);
        let seq = table.to_sequence(&mut alloc, Placement::Stack);
        assert_eq!(seq.len(), 2);
        let mut values: Vec<i32> = Vec::new();
        seq.foreach(|s| values.push(s.value));
        values.sort();
        assert_eq!(values, vec![10, 20]);
    }

    #[test]
    fn filter_keeps_only_matching_entries() {
        let mut alloc = Allocator::new(1 << 16);
        let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Stack, 8);
        for i in 0..10i32 {
            table.put(i, i);
        }
        table.filter(|e| *e.key % 2 == 0);
        assert_eq!(table.load(), 5);
        assert!(table.has(&4));
        assert!(!table.has(&5));
    }
}
