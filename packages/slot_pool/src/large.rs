use std::alloc::{alloc, dealloc};
use std::num::NonZero;
use std::ptr::NonNull;

use crate::{Error, Result, array_layout};

/// Registry of multi-item regions, each allocated directly from the system allocator and
/// tracked by address until freed.
///
/// Lookup by address is a linear scan. This path exists as a simple fallback for occasional
/// array-shaped requests and is not meant to hold many allocations at once.
#[derive(Debug)]
pub(crate) struct LargeAllocations<T> {
    allocations: Vec<LargeAllocation<T>>,
}

/// One region owned by the registry. Dropping the record frees the region.
#[derive(Debug)]
struct LargeAllocation<T> {
    ptr: NonNull<T>,
    count: NonZero<usize>,
}

impl<T> LargeAllocations<T> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            allocations: Vec::new(),
        }
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.allocations.len()
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Allocates an uninitialized region for `count` items and records it.
    ///
    /// On failure, nothing is recorded.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub(crate) fn allocate(&mut self, count: NonZero<usize>) -> Result<NonNull<T>> {
        assert!(
            size_of::<T>() > 0,
            "LargeAllocations must have non-zero item size"
        );

        let layout = array_layout::<T>(count.get())?;

        // Make room for the record first, so a successful allocation can always be recorded.
        self.allocations
            .try_reserve(1)
            .map_err(|_reserve_error| Error::OutOfMemory {
                bytes: size_of::<LargeAllocation<T>>(),
            })?;

        // SAFETY: The layout is not zero-sized because both the count and the size of T are
        // non-zero (guarded above).
        let ptr = unsafe { alloc(layout) };

        let ptr = NonNull::new(ptr.cast::<T>()).ok_or(Error::OutOfMemory {
            bytes: layout.size(),
        })?;

        self.allocations.push(LargeAllocation { ptr, count });

        Ok(ptr)
    }

    /// Frees the region starting at `ptr` and returns the item count it was allocated with.
    ///
    /// Returns `None` without doing anything if no region starts at `ptr`.
    pub(crate) fn free(&mut self, ptr: NonNull<T>) -> Option<NonZero<usize>> {
        let position = self
            .allocations
            .iter()
            .position(|allocation| allocation.ptr == ptr)?;

        let allocation = self.allocations.swap_remove(position);
        let count = allocation.count;

        drop(allocation);

        Some(count)
    }

    /// Frees every region and releases the registry's own storage.
    pub(crate) fn clear(&mut self) {
        self.allocations = Vec::new();
    }
}

impl<T> Drop for LargeAllocation<T> {
    fn drop(&mut self) {
        let layout = array_layout::<T>(self.count.get())
            .expect("layout was already calculated successfully when the region was allocated");

        // SAFETY: The layout must match between alloc and dealloc. It does.
        unsafe {
            dealloc(self.ptr.as_ptr().cast(), layout);
        }
    }
}

// SAFETY: The registry owns its regions exclusively and never touches their contents, so it can
// move between threads as long as the items meant for the regions can.
unsafe impl<T: Send> Send for LargeAllocations<T> {}

#[cfg(test)]
mod tests {
    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(LargeAllocations<u64>: Send);
    assert_not_impl_any!(LargeAllocations<u64>: Sync);

    #[test]
    fn smoke_test() {
        let mut large = LargeAllocations::<u64>::new();
        assert!(large.is_empty());

        let a = large.allocate(nz!(3)).unwrap();
        let b = large.allocate(nz!(5)).unwrap();

        assert_ne!(a, b);
        assert_eq!(large.len(), 2);

        assert_eq!(large.free(a), Some(nz!(3)));
        assert_eq!(large.len(), 1);

        assert_eq!(large.free(b), Some(nz!(5)));
        assert!(large.is_empty());
    }

    #[test]
    fn region_holds_all_items() {
        let mut large = LargeAllocations::<u64>::new();

        let ptr = large.allocate(nz!(10)).unwrap();

        assert!(ptr.is_aligned());

        for index in 0..10 {
            // SAFETY: The region has room for 10 items.
            unsafe {
                ptr.add(index).write(index as u64);
            }
        }

        for index in 0..10 {
            // SAFETY: We initialized all 10 items above.
            assert_eq!(unsafe { ptr.add(index).read() }, index as u64);
        }

        _ = large.free(ptr);
    }

    #[test]
    fn free_unknown_is_none() {
        let mut large = LargeAllocations::<u64>::new();
        let ptr = large.allocate(nz!(2)).unwrap();

        let mut local = 0_u64;
        assert_eq!(large.free(NonNull::from(&mut local)), None);

        assert_eq!(large.len(), 1);

        _ = large.free(ptr);
    }

    #[test]
    fn double_free_is_none() {
        let mut large = LargeAllocations::<u64>::new();
        let ptr = large.allocate(nz!(2)).unwrap();

        assert!(large.free(ptr).is_some());
        assert_eq!(large.free(ptr), None);
    }

    #[test]
    fn overflowing_count_records_nothing() {
        let mut large = LargeAllocations::<u64>::new();

        let result = large.allocate(nz!(usize::MAX));

        assert!(matches!(result, Err(Error::CapacityOverflow { .. })));
        assert!(large.is_empty());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[cfg_attr(miri, ignore = "Miri reports exhaustion instead of returning null")]
    fn exhausted_memory_records_nothing() {
        let mut large = LargeAllocations::<u64>::new();

        // A valid layout that no system can back: 2^62 bytes.
        let count = NonZero::new(1_usize << 59).unwrap();
        let result = large.allocate(count);

        assert!(matches!(result, Err(Error::OutOfMemory { .. })));
        assert!(large.is_empty());
    }

    #[test]
    fn clear_frees_everything() {
        let mut large = LargeAllocations::<String>::new();
        _ = large.allocate(nz!(2)).unwrap();
        _ = large.allocate(nz!(7)).unwrap();

        large.clear();

        assert!(large.is_empty());
    }

    #[test]
    #[should_panic]
    fn zst_is_panic() {
        let mut large = LargeAllocations::<()>::new();
        _ = large.allocate(nz!(2));
    }
}
