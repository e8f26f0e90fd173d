use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::num::NonZero;
use std::ptr::NonNull;

#[cfg(debug_assertions)]
use num_integer::Integer;

use crate::{Error, Result};

/// One contiguous region of uninitialized memory holding a fixed number of slots, each sized and
/// aligned for one `T`.
///
/// The block never reads or writes slot memory and never drops anything stored in it. What is in
/// a slot at any point in time is the business of whoever the slot was handed out to.
///
/// The slot count is fixed at creation. The memory is returned to the system allocator when the
/// block is dropped.
#[derive(Debug)]
pub(crate) struct Block<T> {
    first_slot_ptr: NonNull<T>,
    capacity: NonZero<usize>,
}

impl<T> Block<T> {
    /// Allocates a block with room for `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub(crate) fn new(capacity: NonZero<usize>) -> Result<Self> {
        assert!(size_of::<T>() > 0, "Block must have non-zero item size");

        let layout = array_layout::<T>(capacity.get())?;

        // SAFETY: The layout is not zero-sized because both the capacity and the size of T are
        // non-zero (guarded above).
        let ptr = unsafe { alloc(layout) };

        let first_slot_ptr = NonNull::new(ptr.cast::<T>()).ok_or(Error::OutOfMemory {
            bytes: layout.size(),
        })?;

        Ok(Self {
            first_slot_ptr,
            capacity,
        })
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        assert!(
            index < self.capacity.get(),
            "slot {index} index out of bounds in block of {} with capacity {}",
            type_name::<T>(),
            self.capacity
        );

        // SAFETY: Guarded by bounds check above, so the resulting pointer is inside the
        // allocation we made in the ctor.
        unsafe { self.first_slot_ptr.add(index) }
    }

    /// The address of the first slot.
    #[cfg(debug_assertions)]
    #[must_use]
    pub(crate) fn start_addr(&self) -> usize {
        self.first_slot_ptr.as_ptr().addr()
    }

    /// Returns the index of the slot starting at `ptr`, or `None` if `ptr` does not point to the
    /// start of a slot in this block.
    #[cfg(debug_assertions)]
    #[must_use]
    pub(crate) fn index_of(&self, ptr: NonNull<T>) -> Option<usize> {
        let offset = ptr
            .as_ptr()
            .addr()
            .checked_sub(self.start_addr())?;

        let (index, remainder) = offset.div_rem(&size_of::<T>());

        (remainder == 0 && index < self.capacity.get()).then_some(index)
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        let layout = array_layout::<T>(self.capacity.get())
            .expect("layout was already calculated successfully when the block was created");

        // SAFETY: The layout must match between alloc and dealloc. It does.
        unsafe {
            dealloc(self.first_slot_ptr.as_ptr().cast(), layout);
        }
    }
}

// SAFETY: Yes, there are raw pointers involved here but nothing inherently non-thread-mobile
// about it, so as long as T itself can move between threads, the block can do so, too.
unsafe impl<T: Send> Send for Block<T> {}

/// Calculates the layout of `count` contiguous items of type `T`.
pub(crate) fn array_layout<T>(count: usize) -> Result<Layout> {
    Layout::array::<T>(count).map_err(|_layout_error| Error::CapacityOverflow {
        count,
        item_size: size_of::<T>(),
    })
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    reason = "we do not need to worry about these things when writing test code"
)]
mod tests {
    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(Block<u64>: Send);
    assert_not_impl_any!(Block<u64>: Sync);
    assert_not_impl_any!(Block<std::rc::Rc<u64>>: Send);

    #[test]
    fn smoke_test() {
        let block = Block::<u64>::new(nz!(4)).unwrap();

        assert_eq!(block.capacity().get(), 4);

        let first = block.slot_ptr(0);
        let last = block.slot_ptr(3);

        assert_eq!(
            last.as_ptr().addr() - first.as_ptr().addr(),
            3 * size_of::<u64>()
        );
    }

    #[test]
    fn slots_are_aligned_for_item() {
        #[repr(align(64))]
        struct Aligned([u8; 64]);

        let block = Block::<Aligned>::new(nz!(3)).unwrap();

        for index in 0..3 {
            assert!(block.slot_ptr(index).is_aligned());
        }
    }

    #[test]
    fn slots_are_writable() {
        let block = Block::<String>::new(nz!(2)).unwrap();

        let ptr = block.slot_ptr(1);

        // SAFETY: The slot is sized and aligned for a String and not used by anything else.
        unsafe {
            ptr.as_ptr().write("hello".to_string());
            assert_eq!(ptr.as_ref(), "hello");
            ptr.as_ptr().drop_in_place();
        }
    }

    #[test]
    #[should_panic]
    fn oob_slot_panics() {
        let block = Block::<u32>::new(nz!(2)).unwrap();

        _ = block.slot_ptr(2);
    }

    #[test]
    #[should_panic]
    fn zst_is_panic() {
        drop(Block::<()>::new(nz!(3)));
    }

    #[test]
    fn overflowing_capacity_is_error() {
        let result = Block::<u64>::new(nz!(usize::MAX));

        assert!(matches!(
            result,
            Err(Error::CapacityOverflow {
                count: usize::MAX,
                item_size: 8
            })
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn index_of_finds_every_slot() {
        let block = Block::<u32>::new(nz!(5)).unwrap();

        for index in 0..5 {
            assert_eq!(block.index_of(block.slot_ptr(index)), Some(index));
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    fn index_of_rejects_foreign_and_misaligned() {
        let block = Block::<u32>::new(nz!(5)).unwrap();
        let other = Block::<u32>::new(nz!(5)).unwrap();

        assert_eq!(block.index_of(other.slot_ptr(0)), None);

        // One byte into the second slot is not the start of any slot.
        // SAFETY: Still inside the allocation; we only inspect the address.
        let misaligned = unsafe { block.slot_ptr(1).byte_add(1) };
        assert_eq!(block.index_of(misaligned), None);

        let mut local = 0_u32;
        assert_eq!(block.index_of(NonNull::from(&mut local)), None);
    }
}
