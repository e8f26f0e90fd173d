use std::ptr::NonNull;

use crate::{Result, SlotPool};

/// The allocator contract that generic containers depend on when they want to be able to store
/// their elements in a [`SlotPool`] or in any other allocator of the same shape.
///
/// An implementation hands out uninitialized memory for a number of contiguous elements of `T`
/// and takes it back later. It never constructs or drops elements; that is up to the container.
///
/// # Example
///
/// ```rust
/// use std::ptr::NonNull;
///
/// use slot_pool::{ElementAllocator, SlotPool};
///
/// fn store_pair<A: ElementAllocator<u32>>(allocator: &mut A, a: u32, b: u32) -> NonNull<u32> {
///     let ptr = allocator.allocate(2).unwrap().unwrap();
///
///     // SAFETY: The allocation has room for two u32.
///     unsafe {
///         ptr.write(a);
///         ptr.add(1).write(b);
///     }
///
///     ptr
/// }
///
/// let mut pool = SlotPool::<u32>::new();
/// let pair = store_pair(&mut pool, 1, 2);
///
/// // SAFETY: Allocated above with the same count and holding no values that need dropping.
/// unsafe { ElementAllocator::deallocate(&mut pool, Some(pair), 2) };
/// ```
pub trait ElementAllocator<T> {
    /// The same kind of allocator, for elements of type `U`.
    type Rebind<U>: ElementAllocator<U>;

    /// Allocates uninitialized memory for `count` contiguous elements.
    ///
    /// Returns `Ok(None)` if `count` is zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory cannot be allocated. The allocator is unchanged when an
    /// error is returned.
    fn allocate(&mut self, count: usize) -> Result<Option<NonNull<T>>>;

    /// Returns memory obtained from [`allocate()`][Self::allocate] with the same `count`.
    ///
    /// Nothing happens if `ptr` is `None` or `count` is zero.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `ptr` was returned by `allocate(count)` on this allocator, has
    /// not been deallocated since, and that any elements stored in the memory have already been
    /// dropped or moved out.
    unsafe fn deallocate(&mut self, ptr: Option<NonNull<T>>, count: usize);

    /// Creates an independent, empty allocator for elements of type `U`, configured the same
    /// way as this one.
    #[must_use]
    fn rebind<U>(&self) -> Self::Rebind<U>;
}

impl<T> ElementAllocator<T> for SlotPool<T> {
    type Rebind<U> = SlotPool<U>;

    fn allocate(&mut self, count: usize) -> Result<Option<NonNull<T>>> {
        Self::allocate(self, count)
    }

    unsafe fn deallocate(&mut self, ptr: Option<NonNull<T>>, count: usize) {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { Self::deallocate(self, ptr, count) }
    }

    fn rebind<U>(&self) -> Self::Rebind<U> {
        Self::rebind(self)
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use super::*;

    fn round_trip<T, A: ElementAllocator<T>>(allocator: &mut A, value: T, count: usize)
    where
        T: Clone + PartialEq + std::fmt::Debug,
    {
        let ptr = allocator
            .allocate(count)
            .unwrap()
            .expect("count is non-zero");

        for index in 0..count {
            unsafe { ptr.add(index).write(value.clone()) };
        }

        for index in 0..count {
            assert_eq!(unsafe { ptr.add(index).read() }, value);
        }

        unsafe { allocator.deallocate(Some(ptr), count) };
    }

    #[test]
    fn generic_code_uses_both_paths() {
        let mut pool = SlotPool::<u64>::new();

        round_trip(&mut pool, 7_u64, 1);
        round_trip(&mut pool, 9_u64, 12);

        assert!(pool.is_empty());
        assert_eq!(pool.invalid_free_count(), 0);
    }

    #[test]
    fn generic_zero_count_is_none() {
        fn allocate_nothing<A: ElementAllocator<u8>>(allocator: &mut A) -> bool {
            allocator.allocate(0).unwrap().is_none()
        }

        let mut pool = SlotPool::<u8>::new();

        assert!(allocate_nothing(&mut pool));
        assert_eq!(pool.total_slots(), 0);
    }

    #[test]
    fn generic_rebind_produces_pool_for_other_type() {
        fn nodes_for<A: ElementAllocator<u32>>(allocator: &A) -> A::Rebind<(u32, usize)> {
            allocator.rebind::<(u32, usize)>()
        }

        let pool = SlotPool::<u32>::builder()
            .initial_capacity(64)
            .build()
            .unwrap();

        let mut nodes = nodes_for(&pool);

        round_trip(&mut nodes, (5_u32, 6_usize), 1);

        assert_eq!(nodes.block_size(), pool.block_size());
        assert_eq!(pool.total_slots(), 64);
    }
}
