#[cfg(debug_assertions)]
use std::collections::HashSet;
use std::ptr::NonNull;

use crate::{Block, Error, Result};

/// Stack of slots that are currently available to be handed out, most recently freed on top.
///
/// The stack lives in its own storage instead of being threaded through the free slots
/// themselves, so slot memory is never reinterpreted as link storage. The list does not own the
/// slots; the blocks do.
///
/// Pushing never reallocates as long as the caller keeps the reserved capacity at or above the
/// total number of slots via [`reserve_total()`][Self::reserve_total].
///
/// Debug builds mirror the entries in a set, so membership checks on every free stay O(1).
#[derive(Debug)]
pub(crate) struct FreeList<T> {
    slots: Vec<NonNull<T>>,

    #[cfg(debug_assertions)]
    members: HashSet<NonNull<T>>,
}

impl<T> FreeList<T> {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            #[cfg(debug_assertions)]
            members: HashSet::new(),
        }
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ensures that up to `total` entries fit without reallocating.
    pub(crate) fn reserve_total(&mut self, total: usize) -> Result<()> {
        let additional = total.saturating_sub(self.slots.len());
        let out_of_memory = |_reserve_error| Error::OutOfMemory {
            bytes: total.saturating_mul(size_of::<NonNull<T>>()),
        };

        self.slots
            .try_reserve_exact(additional)
            .map_err(out_of_memory)?;

        #[cfg(debug_assertions)]
        self.members
            .try_reserve(total.saturating_sub(self.members.len()))
            .map_err(out_of_memory)?;

        Ok(())
    }

    pub(crate) fn push(&mut self, slot: NonNull<T>) {
        debug_assert!(
            self.slots.len() < self.slots.capacity(),
            "free-list push would reallocate; capacity was not reserved for all slots"
        );

        #[cfg(debug_assertions)]
        {
            let inserted = self.members.insert(slot);
            debug_assert!(inserted, "slot {slot:p} pushed onto the free-list twice");
        }

        self.slots.push(slot);
    }

    #[must_use]
    pub(crate) fn pop(&mut self) -> Option<NonNull<T>> {
        let slot = self.slots.pop()?;

        #[cfg(debug_assertions)]
        self.members.remove(&slot);

        Some(slot)
    }

    /// Pushes every slot of a new block, in reverse index order so that the slot at index 0 ends
    /// up on top and consecutive pops walk the block in ascending address order.
    pub(crate) fn push_block(&mut self, block: &Block<T>) {
        for index in (0..block.capacity().get()).rev() {
            self.push(block.slot_ptr(index));
        }
    }

    /// Forgets every entry and releases the list's own storage.
    pub(crate) fn clear(&mut self) {
        self.slots = Vec::new();

        #[cfg(debug_assertions)]
        {
            self.members = HashSet::new();
        }
    }

    #[cfg(debug_assertions)]
    #[must_use]
    pub(crate) fn contains(&self, slot: NonNull<T>) -> bool {
        self.members.contains(&slot)
    }

    /// Number of entries the membership set can hold without reallocating.
    #[cfg(debug_assertions)]
    #[must_use]
    pub(crate) fn members_reserved(&self) -> usize {
        self.members.capacity()
    }

    #[cfg(debug_assertions)]
    #[must_use]
    pub(crate) fn reserved(&self) -> usize {
        self.slots.capacity()
    }

    #[cfg(debug_assertions)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = NonNull<T>> {
        self.slots.iter().copied()
    }
}

// SAFETY: The entries are addresses only, never dereferenced by the list. Moving the list to
// another thread is fine as long as the items the addresses are meant for can move, too.
unsafe impl<T: Send> Send for FreeList<T> {}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn pops_in_ascending_address_order_after_push_block() {
        let block = Block::<u64>::new(nz!(4)).unwrap();
        let mut free_list = FreeList::new();
        free_list.reserve_total(4).unwrap();

        free_list.push_block(&block);

        assert_eq!(free_list.len(), 4);

        for index in 0..4 {
            assert_eq!(free_list.pop(), Some(block.slot_ptr(index)));
        }

        assert!(free_list.is_empty());
        assert_eq!(free_list.pop(), None);
    }

    #[test]
    fn last_pushed_is_first_popped() {
        let block = Block::<u64>::new(nz!(4)).unwrap();
        let mut free_list = FreeList::new();
        free_list.reserve_total(4).unwrap();

        free_list.push(block.slot_ptr(2));
        free_list.push(block.slot_ptr(0));

        assert_eq!(free_list.pop(), Some(block.slot_ptr(0)));
        assert_eq!(free_list.pop(), Some(block.slot_ptr(2)));
    }

    #[test]
    fn reserve_total_counts_existing_entries() {
        let block = Block::<u64>::new(nz!(8)).unwrap();
        let mut free_list = FreeList::new();
        free_list.reserve_total(8).unwrap();
        free_list.push_block(&block);

        free_list.reserve_total(12).unwrap();

        assert!(free_list.slots.capacity() >= 12);
    }

    #[test]
    fn reserve_total_overflow_is_error() {
        let mut free_list = FreeList::<u64>::new();

        assert!(matches!(
            free_list.reserve_total(usize::MAX),
            Err(Error::OutOfMemory { .. })
        ));
        assert!(free_list.is_empty());
    }

    #[test]
    fn clear_releases_storage() {
        let block = Block::<u64>::new(nz!(4)).unwrap();
        let mut free_list = FreeList::new();
        free_list.reserve_total(4).unwrap();
        free_list.push_block(&block);

        free_list.clear();

        assert!(free_list.is_empty());
        assert_eq!(free_list.slots.capacity(), 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn contains_tracks_entries() {
        let block = Block::<u64>::new(nz!(2)).unwrap();
        let mut free_list = FreeList::new();
        free_list.reserve_total(2).unwrap();

        free_list.push(block.slot_ptr(1));

        assert!(free_list.contains(block.slot_ptr(1)));
        assert!(!free_list.contains(block.slot_ptr(0)));

        _ = free_list.pop();

        assert!(!free_list.contains(block.slot_ptr(1)));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn membership_follows_push_block_and_clear() {
        let block = Block::<u64>::new(nz!(8)).unwrap();
        let mut free_list = FreeList::new();
        free_list.reserve_total(8).unwrap();

        free_list.push_block(&block);

        assert!(free_list.members_reserved() >= 8);
        assert!((0..8).all(|index| free_list.contains(block.slot_ptr(index))));

        free_list.clear();

        assert!(!free_list.contains(block.slot_ptr(0)));
    }
}
