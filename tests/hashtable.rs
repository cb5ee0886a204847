//! Integration tests for `HashTable<K, V>` (spec.md §8 scenarios 3-4 plus
//! the get/delete/idempotent-put properties).

use csdsa::{Allocator, HashTable, Placement};

#[test]
fn scenario_3_bulk_insert_grows_to_expected_capacity() {
    let mut alloc = Allocator::new(1 << 20);
    let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Heap, 32);

    for i in 0..500 {
        table.put(i, i);
    }

    assert_eq!(table.load(), 500);
    for i in 0..500 {
        assert_eq!(table.get(&i).map(|e| *e.value), Some(i));
    }
    assert!(!table.has(&500));
    assert!(table.capacity() >= 667);
    assert_eq!(table.capacity(), 1024);
}

#[test]
fn scenario_4_repeated_put_same_key_keeps_load_one() {
    let mut alloc = Allocator::new(1 << 16);
    let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Stack, 32);

    for v in 0..500 {
        table.put(7, v);
    }

    assert_eq!(table.load(), 1);
    assert_eq!(table.get(&7).map(|e| *e.value), Some(499));
}

#[test]
fn get_after_put() {
    let mut alloc = Allocator::new(4096);
    let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Stack, 8);
    table.put(3, 30);
    assert_eq!(table.get(&3).map(|e| *e.value), Some(30));
}

#[test]
fn delete_after_put() {
    let mut alloc = Allocator::new(4096);
    let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Heap, 8);
    table.put(3, 30);
    table.del(&3);
    assert!(!table.has(&3));
}

#[test]
fn clear_is_constant_time_and_resets_load() {
    let mut alloc = Allocator::new(4096);
    let mut table: HashTable<i32, i32> = HashTable::init(&mut alloc, Placement::Stack, 8);
    for i in 0..6 {
        table.put(i, i);
    }
    let generation_before = table.generation();
    table.clear();
    assert_eq!(table.load(), 0);
    assert!(table.generation() > generation_before);
    assert!(!table.has(&0));
}
