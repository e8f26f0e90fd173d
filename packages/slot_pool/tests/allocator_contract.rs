//! Integration tests that drive `SlotPool` through the `ElementAllocator` contract the way real
//! containers do: a growable sequence that asks for contiguous storage and a linked stack that
//! asks for one node at a time.

#![allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::arithmetic_side_effects,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]

use std::ptr::{self, NonNull};

use slot_pool::{ElementAllocator, ReleasePolicy, SlotPool};

/// Minimal growable sequence that keeps its elements in memory from an `ElementAllocator`.
struct Seq<T, A: ElementAllocator<T>> {
    ptr: Option<NonNull<T>>,
    len: usize,
    capacity: usize,
    allocator: A,
}

impl<T, A: ElementAllocator<T>> Seq<T, A> {
    fn new(allocator: A) -> Self {
        Self {
            ptr: None,
            len: 0,
            capacity: 0,
            allocator,
        }
    }

    fn push(&mut self, value: T) {
        if self.len == self.capacity {
            self.grow();
        }

        let ptr = self.ptr.expect("capacity is non-zero after growing");

        unsafe { ptr.add(self.len).write(value) };
        self.len += 1;
    }

    fn grow(&mut self) {
        let new_capacity = (self.capacity * 2).max(1);

        let new_ptr = self
            .allocator
            .allocate(new_capacity)
            .unwrap()
            .expect("new capacity is non-zero");

        if let Some(old_ptr) = self.ptr {
            unsafe {
                ptr::copy_nonoverlapping(old_ptr.as_ptr(), new_ptr.as_ptr(), self.len);
                self.allocator.deallocate(Some(old_ptr), self.capacity);
            }
        }

        self.ptr = Some(new_ptr);
        self.capacity = new_capacity;
    }

    fn get(&self, index: usize) -> &T {
        assert!(index < self.len);

        let ptr = self.ptr.expect("non-empty sequence has storage");
        unsafe { ptr.add(index).as_ref() }
    }

    fn allocator(&self) -> &A {
        &self.allocator
    }
}

impl<T, A: ElementAllocator<T>> Drop for Seq<T, A> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr {
            unsafe {
                ptr::slice_from_raw_parts_mut(ptr.as_ptr(), self.len).drop_in_place();
                self.allocator.deallocate(Some(ptr), self.capacity);
            }
        }
    }
}

struct Node<T> {
    value: T,
    next: Option<NonNull<Node<T>>>,
}

/// Minimal linked stack whose nodes come from an allocator rebound to the node type.
struct Stack<T, A: ElementAllocator<T>> {
    nodes: A::Rebind<Node<T>>,
    head: Option<NonNull<Node<T>>>,
    len: usize,
}

impl<T, A: ElementAllocator<T>> Stack<T, A> {
    fn new(allocator: &A) -> Self {
        Self {
            nodes: allocator.rebind::<Node<T>>(),
            head: None,
            len: 0,
        }
    }

    fn push(&mut self, value: T) -> NonNull<Node<T>> {
        let node = self
            .nodes
            .allocate(1)
            .unwrap()
            .expect("single node allocation always returns memory");

        unsafe {
            node.write(Node {
                value,
                next: self.head,
            });
        }

        self.head = Some(node);
        self.len += 1;

        node
    }

    fn pop(&mut self) -> Option<T> {
        let node = self.head?;

        let Node { value, next } = unsafe { node.read() };

        unsafe { self.nodes.deallocate(Some(node), 1) };

        self.head = next;
        self.len -= 1;

        Some(value)
    }

    fn nodes(&self) -> &A::Rebind<Node<T>> {
        &self.nodes
    }
}

impl<T, A: ElementAllocator<T>> Drop for Stack<T, A> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

#[test]
fn seq_keeps_values_across_growth() {
    let mut seq = Seq::new(SlotPool::<String>::new());

    for index in 0..100 {
        seq.push(format!("value {index}"));
    }

    for index in 0..100 {
        assert_eq!(seq.get(index), &format!("value {index}"));
    }

    // Only the current backing region is outstanding; every previous one was returned.
    assert_eq!(seq.allocator().large_allocation_count(), 1);
    assert_eq!(seq.allocator().invalid_free_count(), 0);
}

#[test]
fn seq_first_element_uses_single_slot() {
    let mut seq = Seq::new(SlotPool::<u64>::new());

    seq.push(1);

    assert_eq!(seq.allocator().used_slots(), 1);
    assert_eq!(seq.allocator().large_allocation_count(), 0);

    seq.push(2);

    assert_eq!(seq.allocator().used_slots(), 0);
    assert_eq!(seq.allocator().large_allocation_count(), 1);
    assert_eq!(*seq.get(0) + *seq.get(1), 3);
}

#[test]
fn seq_returns_everything_on_drop() {
    let pool = SlotPool::<u64>::builder()
        .release_policy(ReleasePolicy::MustNotReleaseOutstanding)
        .build()
        .unwrap();

    let mut seq = Seq::new(pool);

    for value in 0..1000 {
        seq.push(value);
    }

    // Dropping the sequence frees its storage and then drops the pool, which would panic if
    // anything were still outstanding.
    drop(seq);
}

#[test]
fn stack_reuses_freed_nodes() {
    let pool = SlotPool::<String>::new();
    let mut stack = Stack::<String, _>::new(&pool);

    for index in 0..40 {
        _ = stack.push(format!("node {index}"));
    }

    let total_after_fill = stack.nodes().total_slots();
    assert_eq!(stack.nodes().used_slots(), 40);

    for index in (20..40).rev() {
        assert_eq!(stack.pop(), Some(format!("node {index}")));
    }

    for index in 20..40 {
        _ = stack.push(format!("again {index}"));
    }

    assert_eq!(stack.nodes().total_slots(), total_after_fill);
    assert_eq!(stack.len, 40);

    // The rebound pool is independent of the one it was derived from.
    assert_eq!(pool.total_slots(), 0);
}

#[test]
fn stack_most_recently_freed_node_comes_back_first() {
    let pool = SlotPool::<u32>::new();
    let mut stack = Stack::<u32, _>::new(&pool);

    _ = stack.push(1);
    let second = stack.push(2);

    assert_eq!(stack.pop(), Some(2));

    let third = stack.push(3);

    assert_eq!(second, third);
}

#[test]
fn stack_drop_returns_all_nodes() {
    let pool = SlotPool::<u32>::builder()
        .release_policy(ReleasePolicy::MustNotReleaseOutstanding)
        .build()
        .unwrap();

    let mut stack = Stack::<u32, _>::new(&pool);

    for value in 0..100 {
        _ = stack.push(value);
    }

    drop(stack);
}
