use std::any::type_name;
#[cfg(debug_assertions)]
use std::collections::{BTreeMap, HashSet};
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::{mem, thread};

use new_zealand::nz;
use tracing::{debug, trace, warn};

use crate::{
    Block, Error, FreeList, InvalidFree, InvalidFreePolicy, LargeAllocations, PoolConfig,
    ReleasePolicy, Request, Result, SlotPoolBuilder,
};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The minimum number of slots in a block unless configured otherwise via
/// [`SlotPoolBuilder::block_size()`].
pub const DEFAULT_BLOCK_SIZE: NonZero<usize> = nz!(16);

/// A typed memory pool that hands out uninitialized slots sized for one `T` each.
///
/// The pool is an allocator, not a collection: it never creates, reads or drops values of `T`.
/// Callers write a value into memory they obtained from [`allocate()`][1] and drop it before
/// handing the memory back via [`deallocate()`][2].
///
/// There are two allocation paths, selected by the requested item count:
///
/// * A single item is served from a free-list of slots carved out of fixed-capacity blocks.
///   Freed slots go back on top of the free-list and are the first to be reused. When the
///   free-list is empty, the pool allocates a new block of at least
///   [`block_size()`][3] slots.
/// * Multiple contiguous items are served by a dedicated allocation that bypasses the blocks and
///   is tracked by address until freed. Such regions are never reused.
///
/// # Resource usage
///
/// The pool grows as needed and never returns individual blocks to the system. All memory,
/// including outstanding multi-item regions, is released at once via
/// [`release_all()`][4] or when the pool is dropped.
///
/// # Identity
///
/// Pools are resources, not values. A pool cannot be cloned. Two pools compare equal only if
/// they are the same pool, meaning memory obtained from one of them may be returned to the
/// other. Use [`empty_like()`][5] to create an independent pool with the same configuration
/// and [`take()`][6] to move the contents of a pool out, leaving an empty pool behind.
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) if `T` is, but it is not thread-safe ([`Sync`]). It is
/// designed for single-threaded use and contains no synchronization. Sharing it between threads
/// requires external locking.
///
/// # Example
///
/// ```rust
/// use slot_pool::SlotPool;
///
/// let mut pool = SlotPool::<String>::new();
///
/// let slot = pool.allocate(1).unwrap().unwrap();
///
/// // SAFETY: The slot is sized and aligned for one String and belongs to us.
/// unsafe {
///     slot.write("Hello".to_string());
///     assert_eq!(slot.as_ref(), "Hello");
///     slot.drop_in_place();
///
///     pool.deallocate(Some(slot), 1);
/// }
///
/// assert_eq!(pool.used_slots(), 0);
/// ```
///
/// [1]: Self::allocate
/// [2]: Self::deallocate
/// [3]: Self::block_size
/// [4]: Self::release_all
/// [5]: Self::empty_like
/// [6]: Self::take
#[derive(Debug)]
pub struct SlotPool<T> {
    /// Identifies the pool for equality purposes. Transferred together with the contents by
    /// `take()`, as the destination is the same allocator from the perspective of any caller
    /// holding memory obtained from it.
    pool_id: u64,

    /// The blocks that provide the storage for single-slot allocations. Blocks are only ever
    /// added, until all of them are released at once.
    blocks: Vec<Block<T>>,

    /// Index into `blocks` keyed by the address of the first slot of each block, for looking up
    /// the block a freed slot belongs to.
    #[cfg(debug_assertions)]
    block_starts: BTreeMap<usize, usize>,

    /// Slots in `blocks` that are not currently handed out, most recently freed on top.
    free_list: FreeList<T>,

    /// Regions handed out for multi-item requests.
    large_allocations: LargeAllocations<T>,

    /// Sum of the capacities of all blocks.
    total_slots: usize,

    /// Number of single slots currently handed out.
    used_slots: usize,

    /// Number of invalid frees detected over the lifetime of the pool.
    invalid_frees: usize,

    config: PoolConfig,
}

impl<T> SlotPool<T> {
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub(crate) fn new_inner(config: PoolConfig) -> Self {
        assert!(size_of::<T>() > 0, "SlotPool must have non-zero item size");

        Self {
            pool_id: generate_pool_id(),
            blocks: Vec::new(),
            #[cfg(debug_assertions)]
            block_starts: BTreeMap::new(),
            free_list: FreeList::new(),
            large_allocations: LargeAllocations::new(),
            total_slots: 0,
            used_slots: 0,
            invalid_frees: 0,
            config,
        }
    }

    /// Creates a new empty [`SlotPool`] with the default configuration.
    ///
    /// The pool does not allocate any memory until the first allocation request.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u64>::new();
    ///
    /// assert_eq!(pool.total_slots(), 0);
    /// assert!(pool.is_empty());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn new() -> Self {
        Self::new_inner(PoolConfig::default())
    }

    /// Creates a new [`SlotPool`] with the default configuration and room for at least
    /// `initial_capacity` single-slot allocations.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u64>::with_capacity(10).unwrap();
    ///
    /// // Capacity is rounded up to a whole block.
    /// assert_eq!(pool.total_slots(), 16);
    /// assert_eq!(pool.used_slots(), 0);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the memory for the initial capacity cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        Self::builder().initial_capacity(initial_capacity).build()
    }

    /// Starts building a new [`SlotPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{ReleasePolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u32>::builder()
    ///     .release_policy(ReleasePolicy::MustNotReleaseOutstanding)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }

    /// Creates a new empty pool with the same configuration as this one.
    ///
    /// The new pool shares nothing with this one and does not compare equal to it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u64>::with_capacity(100).unwrap();
    /// let other = pool.empty_like();
    ///
    /// assert_eq!(other.total_slots(), 0);
    /// assert_ne!(pool, other);
    /// ```
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::new_inner(self.config)
    }

    /// Creates a new empty pool for items of type `U`, with the same configuration as this one.
    ///
    /// No state is carried over: the new pool owns no memory and is unrelated to this one.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u64>::builder()
    ///     .initial_capacity(32)
    ///     .build()
    ///     .unwrap();
    ///
    /// let nodes = pool.rebind::<(u64, u64)>();
    ///
    /// assert_eq!(nodes.total_slots(), 0);
    /// assert_eq!(nodes.block_size(), pool.block_size());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `U` is zero-sized.
    #[must_use]
    pub fn rebind<U>(&self) -> SlotPool<U> {
        SlotPool::new_inner(self.config)
    }

    /// Moves all blocks, free slots, large allocations and counters out into a new pool value,
    /// leaving this pool empty and ready for reuse.
    ///
    /// The returned pool is the same allocator as far as outstanding memory is concerned: it
    /// compares equal to this pool as it was before the call, and memory allocated before the
    /// call must be returned to it. This pool gets a new identity.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut source = SlotPool::<u64>::new();
    /// let slot = source.allocate(1).unwrap();
    ///
    /// let mut destination = source.take();
    ///
    /// assert_eq!(source.total_slots(), 0);
    /// assert_eq!(destination.used_slots(), 1);
    ///
    /// // SAFETY: The slot was allocated by the pool now owned by `destination`.
    /// unsafe { destination.deallocate(slot, 1) };
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        let empty = self.empty_like();
        mem::replace(self, empty)
    }

    /// The number of slots across all blocks, whether handed out or free.
    ///
    /// This does not include multi-item allocations.
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.total_slots
    }

    /// The number of single slots currently handed out.
    #[must_use]
    pub fn used_slots(&self) -> usize {
        self.used_slots
    }

    /// The number of slots that can be handed out without allocating a new block.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.free_list.len()
    }

    /// Whether the pool has no single slots and no multi-item allocations outstanding.
    ///
    /// An empty pool may still be holding unused capacity.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u16>::new();
    /// assert!(pool.is_empty());
    ///
    /// let slot = pool.allocate(1).unwrap();
    /// assert!(!pool.is_empty());
    ///
    /// // SAFETY: The slot was allocated by this pool and holds no value.
    /// unsafe { pool.deallocate(slot, 1) };
    /// assert!(pool.is_empty());
    /// assert!(pool.total_slots() > 0);
    /// ```
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used_slots == 0 && self.large_allocations.is_empty()
    }

    /// The number of blocks the pool has allocated since it was created or last released.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The number of multi-item allocations currently handed out.
    #[must_use]
    pub fn large_allocation_count(&self) -> usize {
        self.large_allocations.len()
    }

    /// The number of invalid frees the pool has detected since it was created.
    ///
    /// See [`InvalidFreePolicy`] for what qualifies as an invalid free.
    #[must_use]
    pub fn invalid_free_count(&self) -> usize {
        self.invalid_frees
    }

    /// The minimum number of slots in each block the pool allocates.
    #[must_use]
    pub fn block_size(&self) -> NonZero<usize> {
        self.config.block_size
    }

    /// Allocates uninitialized memory for `count` contiguous items of type `T`.
    ///
    /// * For a count of zero, returns `Ok(None)` without doing anything.
    /// * For a count of one, returns the most recently freed slot, or a slot from a newly
    ///   allocated block if no slot is free.
    /// * For larger counts, returns a dedicated region for exactly `count` items.
    ///
    /// The memory is suitably sized and aligned for `count` items of `T` but not initialized.
    /// It remains valid until returned via [`deallocate()`][1] with the same count, or until
    /// the pool releases its memory.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::new();
    ///
    /// assert!(pool.allocate(0).unwrap().is_none());
    ///
    /// let single = pool.allocate(1).unwrap();
    /// let array = pool.allocate(8).unwrap();
    ///
    /// assert_eq!(pool.used_slots(), 1);
    /// assert_eq!(pool.large_allocation_count(), 1);
    ///
    /// // SAFETY: Both were allocated by this pool with these counts and hold no values.
    /// unsafe {
    ///     pool.deallocate(single, 1);
    ///     pool.deallocate(array, 8);
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the system allocator cannot provide the memory and
    /// [`Error::CapacityOverflow`] if the request cannot be described as a memory layout. The
    /// pool is unchanged when an error is returned.
    ///
    /// [1]: Self::deallocate
    pub fn allocate(&mut self, count: usize) -> Result<Option<NonNull<T>>> {
        match Request::from_count(count) {
            None => Ok(None),
            Some(Request::Single) => self.allocate_single().map(Some),
            Some(Request::Bulk { count }) => self.allocate_bulk(count).map(Some),
        }
    }

    fn allocate_single(&mut self) -> Result<NonNull<T>> {
        if self.free_list.is_empty() {
            self.grow(self.config.block_size.get())?;
        }

        let slot = self
            .free_list
            .pop()
            .expect("we just ensured that the free-list has at least one slot");

        self.used_slots = self
            .used_slots
            .checked_add(1)
            .expect("guarded by used slots never exceeding total slots");

        Ok(slot)
    }

    fn allocate_bulk(&mut self, count: NonZero<usize>) -> Result<NonNull<T>> {
        let ptr = self.large_allocations.allocate(count)?;

        trace!(
            count = count.get(),
            outstanding = self.large_allocations.len(),
            item_type = type_name::<T>(),
            "served large allocation"
        );

        Ok(ptr)
    }

    /// Returns memory obtained from [`allocate()`][1] to the pool.
    ///
    /// Nothing happens if `ptr` is `None` or `count` is zero. The pool never drops values, so
    /// any value the memory holds must have been dropped by the caller already or it is leaked.
    ///
    /// A multi-item region whose address the pool does not recognize is an invalid free and is
    /// handled according to the pool's [`InvalidFreePolicy`]. In debug builds, single slots that
    /// are not part of any block or are already free are detected in the same way.
    ///
    /// # Safety
    ///
    /// If `count` is one, the caller must ensure that `ptr` was returned by `allocate(1)` on this
    /// pool (or on a pool whose contents were moved into this one by [`take()`][2]), has not
    /// been deallocated since, and that the pool has not released its memory since.
    ///
    /// [1]: Self::allocate
    /// [2]: Self::take
    pub unsafe fn deallocate(&mut self, ptr: Option<NonNull<T>>, count: usize) {
        let Some(ptr) = ptr else {
            return;
        };

        match Request::from_count(count) {
            None => {}
            // SAFETY: Forwarding safety requirements to the caller.
            Some(Request::Single) => unsafe { self.deallocate_single(ptr) },
            Some(Request::Bulk { count }) => self.deallocate_bulk(ptr, count),
        }
    }

    /// # Safety
    ///
    /// See `deallocate()`.
    unsafe fn deallocate_single(&mut self, ptr: NonNull<T>) {
        #[cfg(debug_assertions)]
        if let Some(problem) = self.diagnose_single_free(ptr) {
            self.handle_invalid_free(ptr, 1, problem);
            return;
        }

        self.used_slots = self
            .used_slots
            .checked_sub(1)
            .expect("deallocated a single slot while none were handed out");

        self.free_list.push(ptr);
    }

    fn deallocate_bulk(&mut self, ptr: NonNull<T>, count: NonZero<usize>) {
        let Some(allocated_count) = self.large_allocations.free(ptr) else {
            self.handle_invalid_free(ptr, count.get(), InvalidFree::UnknownAddress);
            return;
        };

        if allocated_count != count {
            warn!(
                allocated_count = allocated_count.get(),
                deallocated_count = count.get(),
                item_type = type_name::<T>(),
                "large allocation freed with a different count than it was allocated with"
            );
        }

        trace!(
            count = allocated_count.get(),
            outstanding = self.large_allocations.len(),
            item_type = type_name::<T>(),
            "freed large allocation"
        );
    }

    #[cfg(debug_assertions)]
    fn diagnose_single_free(&self, ptr: NonNull<T>) -> Option<InvalidFree> {
        if !self.is_slot_start(ptr) {
            return Some(InvalidFree::UnknownAddress);
        }

        if self.free_list.contains(ptr) {
            return Some(InvalidFree::AlreadyFree);
        }

        None
    }

    /// Whether `ptr` points to the start of a slot in one of the blocks. The only candidate is
    /// the block with the highest start address not above `ptr`.
    #[cfg(debug_assertions)]
    fn is_slot_start(&self, ptr: NonNull<T>) -> bool {
        self.block_starts
            .range(..=ptr.as_ptr().addr())
            .next_back()
            .and_then(|(_, &index)| self.blocks.get(index))
            .is_some_and(|block| block.index_of(ptr).is_some())
    }

    fn handle_invalid_free(&mut self, ptr: NonNull<T>, count: usize, problem: InvalidFree) {
        self.invalid_frees = self
            .invalid_frees
            .checked_add(1)
            .expect("cannot overflow because every invalid free takes a call to observe");

        match self.config.invalid_free_policy {
            InvalidFreePolicy::Ignore => warn!(
                address = ptr.as_ptr().addr(),
                count,
                %problem,
                item_type = type_name::<T>(),
                "ignoring invalid free"
            ),
            InvalidFreePolicy::Panic => panic!(
                "invalid free of {count} item(s) at {ptr:p} in slot pool of {}: {problem}",
                type_name::<T>()
            ),
        }
    }

    /// Ensures that the pool has at least `total_slots` slots in total, allocating one new block
    /// for the difference if needed.
    ///
    /// The new block has at least [`block_size()`][1] slots. Slots in the new block are handed
    /// out before previously freed slots, in ascending address order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u64>::new();
    ///
    /// pool.reserve(40).unwrap();
    /// assert_eq!(pool.total_slots(), 40);
    /// assert_eq!(pool.block_count(), 1);
    ///
    /// // Already have enough, so nothing happens.
    /// pool.reserve(10).unwrap();
    /// assert_eq!(pool.total_slots(), 40);
    ///
    /// // Small increments are rounded up to a whole block.
    /// pool.reserve(41).unwrap();
    /// assert_eq!(pool.total_slots(), 56);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the memory for the new block cannot be allocated. The pool is
    /// unchanged when an error is returned.
    ///
    /// [1]: Self::block_size
    pub fn reserve(&mut self, total_slots: usize) -> Result<()> {
        let Some(additional) = total_slots.checked_sub(self.total_slots) else {
            return Ok(());
        };

        if additional == 0 {
            return Ok(());
        }

        self.grow(additional)
    }

    /// Adds one block with room for at least `count` slots and pushes all of its slots onto
    /// the free-list. Either everything happens or nothing does.
    fn grow(&mut self, count: usize) -> Result<()> {
        let block_slots = NonZero::new(count)
            .map_or(self.config.block_size, |count| count.max(self.config.block_size));

        let new_total_slots =
            self.total_slots
                .checked_add(block_slots.get())
                .ok_or(Error::CapacityOverflow {
                    count: block_slots.get(),
                    item_size: size_of::<T>(),
                })?;

        // Bookkeeping space first, so once the block exists, nothing else can fail.
        self.free_list.reserve_total(new_total_slots)?;

        self.blocks
            .try_reserve(1)
            .map_err(|_reserve_error| Error::OutOfMemory {
                bytes: size_of::<Block<T>>(),
            })?;

        let block = Block::new(block_slots)?;

        self.free_list.push_block(&block);

        #[cfg(debug_assertions)]
        self.block_starts
            .insert(block.start_addr(), self.blocks.len());

        self.blocks.push(block);
        self.total_slots = new_total_slots;

        debug!(
            block_slots = block_slots.get(),
            total_slots = self.total_slots,
            item_type = type_name::<T>(),
            "added block to slot pool"
        );

        Ok(())
    }

    /// Releases all memory owned by the pool: every block and every outstanding multi-item
    /// allocation. Afterwards, the pool is in the same state as a newly created one.
    ///
    /// Any memory previously handed out becomes invalid. No values are dropped. Calling this on
    /// a pool without memory does nothing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u64>::with_capacity(100).unwrap();
    /// _ = pool.allocate(1).unwrap();
    /// _ = pool.allocate(5).unwrap();
    ///
    /// pool.release_all();
    ///
    /// assert_eq!(pool.total_slots(), 0);
    /// assert_eq!(pool.used_slots(), 0);
    /// assert_eq!(pool.large_allocation_count(), 0);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pool's [`ReleasePolicy`] forbids releasing outstanding allocations and
    /// some allocations are outstanding. The memory is released before the panic.
    pub fn release_all(&mut self) {
        let outstanding = self.outstanding();

        self.release_memory();

        self.enforce_release_policy(outstanding);
    }

    /// Returns the number of outstanding single slots and outstanding multi-item allocations.
    fn outstanding(&self) -> (usize, usize) {
        (self.used_slots, self.large_allocations.len())
    }

    fn release_memory(&mut self) {
        let released_blocks = self.blocks.len();
        let released_large_allocations = self.large_allocations.len();

        self.free_list.clear();
        self.blocks = Vec::new();
        self.large_allocations.clear();

        #[cfg(debug_assertions)]
        {
            self.block_starts = BTreeMap::new();
        }

        self.total_slots = 0;
        self.used_slots = 0;

        if released_blocks > 0 || released_large_allocations > 0 {
            debug!(
                released_blocks,
                released_large_allocations,
                item_type = type_name::<T>(),
                "released all slot pool memory"
            );
        }
    }

    fn enforce_release_policy(&self, (slots, large_allocations): (usize, usize)) {
        if self.config.release_policy == ReleasePolicy::MustNotReleaseOutstanding {
            assert!(
                slots == 0 && large_allocations == 0,
                "released slot pool of {} with {slots} outstanding slot(s) and {large_allocations} outstanding large allocation(s) under a policy that forbids it",
                type_name::<T>()
            );
        }
    }

    /// Verifies that the bookkeeping of the pool is consistent.
    ///
    /// This is a debugging aid for tests of code built on top of the pool. It runs in time
    /// proportional to the number of slots.
    ///
    /// # Panics
    ///
    /// Panics if any invariant of the pool is violated.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub fn integrity_check(&self) {
        let observed_total_slots: usize = self
            .blocks
            .iter()
            .map(|block| block.capacity().get())
            .sum();

        assert_eq!(
            observed_total_slots,
            self.total_slots,
            "total slots do not match the capacity of all blocks in slot pool of {}",
            type_name::<T>()
        );

        assert!(
            self.used_slots <= self.total_slots,
            "used slots {} exceed total slots {} in slot pool of {}",
            self.used_slots,
            self.total_slots,
            type_name::<T>()
        );

        assert_eq!(
            self.free_list
                .len()
                .checked_add(self.used_slots)
                .expect("both are bounded by total slots"),
            self.total_slots,
            "free and used slots do not add up to total slots in slot pool of {}",
            type_name::<T>()
        );

        assert!(
            self.free_list.reserved() >= self.total_slots,
            "free-list cannot hold every slot without reallocating in slot pool of {}",
            type_name::<T>()
        );

        assert!(
            self.free_list.members_reserved() >= self.total_slots,
            "free-list membership set cannot hold every slot without reallocating in slot pool of {}",
            type_name::<T>()
        );

        assert_eq!(
            self.block_starts.len(),
            self.blocks.len(),
            "block address index is out of sync with the blocks in slot pool of {}",
            type_name::<T>()
        );

        let mut seen = HashSet::with_capacity(self.free_list.len());

        for slot in self.free_list.iter() {
            assert!(
                self.is_slot_start(slot),
                "free-list entry {slot:p} is not a slot of any block in slot pool of {}",
                type_name::<T>()
            );

            assert!(
                seen.insert(slot),
                "free-list entry {slot:p} is present more than once in slot pool of {}",
                type_name::<T>()
            );

            assert!(
                self.free_list.contains(slot),
                "free-list entry {slot:p} is missing from the membership set in slot pool of {}",
                type_name::<T>()
            );
        }
    }
}

impl<T> Default for SlotPool<T> {
    /// Creates a new empty [`SlotPool`] with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PartialEq for SlotPool<T> {
    /// Pools are equal only if they are the same pool.
    fn eq(&self, other: &Self) -> bool {
        self.pool_id == other.pool_id
    }
}

impl<T> Eq for SlotPool<T> {}

impl<T> Drop for SlotPool<T> {
    fn drop(&mut self) {
        let outstanding = self.outstanding();

        self.release_memory();

        // Never a second panic while already unwinding.
        if !thread::panicking() {
            self.enforce_release_policy(outstanding);
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::fmt::Debug;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(SlotPool<u64>: Send, Debug, Eq);
    assert_not_impl_any!(SlotPool<u64>: Sync, Clone, Copy);
    assert_not_impl_any!(SlotPool<Rc<u64>>: Send);

    fn allocate_one<T>(pool: &mut SlotPool<T>) -> NonNull<T> {
        pool.allocate(1)
            .unwrap()
            .expect("single-slot allocation always returns a slot")
    }

    #[test]
    fn smoke_test() {
        let mut pool = SlotPool::<u64>::new();

        assert_eq!(pool.total_slots(), 0);
        assert_eq!(pool.used_slots(), 0);
        assert!(pool.is_empty());

        let a = allocate_one(&mut pool);
        let b = allocate_one(&mut pool);
        let c = allocate_one(&mut pool);

        unsafe {
            a.write(42);
            b.write(43);
            c.write(44);
        }

        assert_eq!(pool.used_slots(), 3);
        assert_eq!(pool.total_slots(), DEFAULT_BLOCK_SIZE.get());
        assert!(!pool.is_empty());

        unsafe {
            assert_eq!(a.read(), 42);
            assert_eq!(b.read(), 43);
            assert_eq!(c.read(), 44);

            pool.deallocate(Some(b), 1);
        }

        let d = allocate_one(&mut pool);
        assert_eq!(d, b);

        unsafe {
            d.write(45);
            assert_eq!(a.read(), 42);
            assert_eq!(c.read(), 44);
            assert_eq!(d.read(), 45);
        }

        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn allocate_zero_is_none() {
        let mut pool = SlotPool::<u64>::new();

        assert_eq!(pool.allocate(0).unwrap(), None);
        assert_eq!(pool.total_slots(), 0);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.large_allocation_count(), 0);
    }

    #[test]
    fn freed_slot_is_reused_first() {
        let mut pool = SlotPool::<u64>::new();

        let first = allocate_one(&mut pool);
        unsafe { pool.deallocate(Some(first), 1) };

        let second = allocate_one(&mut pool);

        assert_eq!(first, second);
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn freed_slots_are_reused_in_reverse_order() {
        let mut pool = SlotPool::<u64>::new();

        let a = allocate_one(&mut pool);
        let b = allocate_one(&mut pool);
        let c = allocate_one(&mut pool);

        unsafe {
            pool.deallocate(Some(a), 1);
            pool.deallocate(Some(c), 1);
            pool.deallocate(Some(b), 1);
        }

        assert_eq!(allocate_one(&mut pool), b);
        assert_eq!(allocate_one(&mut pool), c);
        assert_eq!(allocate_one(&mut pool), a);
    }

    #[test]
    fn fresh_block_is_handed_out_in_ascending_order() {
        let mut pool = SlotPool::<u64>::new();

        let slots = (0..DEFAULT_BLOCK_SIZE.get())
            .map(|_| allocate_one(&mut pool))
            .collect::<Vec<_>>();

        for pair in slots.windows(2) {
            assert_eq!(
                pair[1].as_ptr().addr() - pair[0].as_ptr().addr(),
                size_of::<u64>()
            );
        }

        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn new_slots_are_handed_out_before_older_free_slots() {
        let mut pool = SlotPool::<u64>::builder()
            .block_size(nz!(2))
            .build()
            .unwrap();

        let a = allocate_one(&mut pool);
        unsafe { pool.deallocate(Some(a), 1) };

        // The free-list holds `a` and the untouched second slot of the first block.
        // A new block pushes its slots on top of those.
        pool.reserve(4).unwrap();

        let b = allocate_one(&mut pool);
        assert_ne!(b, a);
        assert_eq!(pool.block_count(), 2);

        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn first_single_allocation_adds_one_default_block() {
        let mut pool = SlotPool::<u64>::new();

        _ = allocate_one(&mut pool);

        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.total_slots(), DEFAULT_BLOCK_SIZE.get());
        assert_eq!(pool.free_slots(), DEFAULT_BLOCK_SIZE.get() - 1);
    }

    #[test]
    fn exhausting_block_adds_exactly_one_block() {
        let mut pool = SlotPool::<u64>::new();

        for _ in 0..DEFAULT_BLOCK_SIZE.get() {
            _ = allocate_one(&mut pool);
        }

        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.free_slots(), 0);

        _ = allocate_one(&mut pool);

        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.total_slots(), 2 * DEFAULT_BLOCK_SIZE.get());

        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn used_slots_stay_within_total_slots() {
        let mut pool = SlotPool::<u32>::builder()
            .block_size(nz!(3))
            .build()
            .unwrap();

        let mut outstanding = Vec::new();

        // A deterministic mix of allocations and frees that crosses several block boundaries.
        for step in 0_usize..200 {
            if step % 3 == 2 {
                if let Some(slot) = outstanding.pop() {
                    unsafe { pool.deallocate(Some(slot), 1) };
                }
            } else {
                outstanding.push(allocate_one(&mut pool));
            }

            assert!(pool.used_slots() <= pool.total_slots());
            assert_eq!(pool.used_slots(), outstanding.len());
        }

        for slot in outstanding.drain(..) {
            unsafe { pool.deallocate(Some(slot), 1) };
        }

        assert_eq!(pool.used_slots(), 0);
        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn reserve_then_allocate_does_not_grow() {
        let mut pool = SlotPool::<u64>::new();

        pool.reserve(50).unwrap();
        let blocks_after_reserve = pool.block_count();

        for _ in 0..50 {
            _ = allocate_one(&mut pool);
        }

        assert_eq!(pool.block_count(), blocks_after_reserve);
        assert_eq!(pool.used_slots(), 50);
    }

    #[test]
    fn reserve_below_total_is_noop() {
        let mut pool = SlotPool::<u64>::with_capacity(32).unwrap();

        pool.reserve(0).unwrap();
        pool.reserve(31).unwrap();
        pool.reserve(32).unwrap();

        assert_eq!(pool.total_slots(), 32);
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn reserve_rounds_up_to_block_size() {
        let mut pool = SlotPool::<u64>::new();

        pool.reserve(1).unwrap();

        assert_eq!(pool.total_slots(), DEFAULT_BLOCK_SIZE.get());
    }

    #[test]
    fn reserve_grows_by_difference() {
        let mut pool = SlotPool::<u64>::with_capacity(20).unwrap();

        pool.reserve(100).unwrap();

        assert_eq!(pool.total_slots(), 100);
        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.free_slots(), 100);

        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn reserve_overflow_is_error_and_changes_nothing() {
        let mut pool = SlotPool::<u64>::with_capacity(16).unwrap();

        assert!(pool.reserve(usize::MAX).is_err());

        assert_eq!(pool.total_slots(), 16);
        assert_eq!(pool.block_count(), 1);
        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[cfg_attr(miri, ignore = "Miri reports exhaustion instead of returning null")]
    fn failed_free_list_reservation_changes_nothing() {
        let mut pool = SlotPool::<u64>::builder()
            .block_size(NonZero::new(1_usize << 59).unwrap())
            .build()
            .unwrap();

        let result = pool.allocate(1);

        // The free-list needs one address per slot: 2^59 * 8 bytes.
        assert!(matches!(result, Err(Error::OutOfMemory { bytes }) if bytes == 1 << 62));
        assert_eq!(pool.total_slots(), 0);
        assert_eq!(pool.used_slots(), 0);
        assert_eq!(pool.block_count(), 0);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[cfg_attr(miri, ignore = "Miri reports exhaustion instead of returning null")]
    fn failed_block_allocation_changes_nothing() {
        // 2^20 slots of 1 TiB each: the free-list fits in a few MiB but the block needs 2^60
        // bytes, more than any address space can hold.
        type Huge = [u8; 1 << 40];

        let mut pool = SlotPool::<Huge>::builder()
            .block_size(nz!(1 << 20))
            .build()
            .unwrap();

        let result = pool.allocate(1);

        assert!(matches!(result, Err(Error::OutOfMemory { bytes }) if bytes == 1 << 60));
        assert_eq!(pool.total_slots(), 0);
        assert_eq!(pool.used_slots(), 0);
        assert_eq!(pool.free_slots(), 0);
        assert_eq!(pool.block_count(), 0);

        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn initial_capacity_scenario() {
        // 10 requested slots are rounded up to one block of 16.
        let mut pool = SlotPool::<u64>::with_capacity(10).unwrap();
        assert_eq!(pool.total_slots(), 16);

        let mut slots = Vec::new();

        for _ in 0..16 {
            slots.push(allocate_one(&mut pool));
        }

        assert_eq!(pool.block_count(), 1);

        slots.push(allocate_one(&mut pool));

        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.total_slots(), 32);

        for slot in slots.drain(..) {
            unsafe { pool.deallocate(Some(slot), 1) };
        }

        assert_eq!(pool.used_slots(), 0);
        assert!(pool.total_slots() >= 26);
        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn release_all_resets_pool() {
        let mut pool = SlotPool::<u64>::with_capacity(40).unwrap();

        _ = allocate_one(&mut pool);
        _ = pool.allocate(4).unwrap();

        pool.release_all();

        assert_eq!(pool.total_slots(), 0);
        assert_eq!(pool.used_slots(), 0);
        assert_eq!(pool.free_slots(), 0);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.large_allocation_count(), 0);
        assert!(pool.is_empty());

        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn release_all_is_idempotent() {
        let mut pool = SlotPool::<u64>::with_capacity(8).unwrap();

        pool.release_all();
        pool.release_all();

        assert_eq!(pool.total_slots(), 0);
    }

    #[test]
    fn allocate_after_release_behaves_like_new_pool() {
        let mut released = SlotPool::<u64>::with_capacity(100).unwrap();
        _ = allocate_one(&mut released);
        released.release_all();

        let mut fresh = SlotPool::<u64>::new();

        _ = allocate_one(&mut released);
        _ = allocate_one(&mut fresh);

        assert_eq!(released.block_count(), fresh.block_count());
        assert_eq!(released.total_slots(), fresh.total_slots());
        assert_eq!(released.used_slots(), fresh.used_slots());
        assert_eq!(released.free_slots(), fresh.free_slots());
    }

    #[test]
    fn values_survive_until_deallocated() {
        let mut pool = SlotPool::<String>::new();

        let slots = (0..40)
            .map(|index| {
                let slot = allocate_one(&mut pool);
                unsafe { slot.write(format!("item {index}")) };
                slot
            })
            .collect::<Vec<_>>();

        for (index, slot) in slots.iter().enumerate() {
            assert_eq!(unsafe { slot.as_ref() }, &format!("item {index}"));
        }

        for slot in slots {
            unsafe {
                slot.drop_in_place();
                pool.deallocate(Some(slot), 1);
            }
        }

        assert!(pool.is_empty());
    }

    #[test]
    fn bulk_allocation_is_tracked_separately() {
        let mut pool = SlotPool::<u64>::new();

        let array = pool.allocate(10).unwrap().unwrap();

        assert_eq!(pool.large_allocation_count(), 1);
        assert_eq!(pool.total_slots(), 0);
        assert_eq!(pool.used_slots(), 0);
        assert_eq!(pool.block_count(), 0);
        assert!(!pool.is_empty());

        for index in 0..10 {
            unsafe { array.add(index).write(index as u64 * 3) };
        }

        for index in 0..10 {
            assert_eq!(unsafe { array.add(index).read() }, index as u64 * 3);
        }

        unsafe { pool.deallocate(Some(array), 10) };

        assert_eq!(pool.large_allocation_count(), 0);
        assert!(pool.is_empty());
        assert_eq!(pool.invalid_free_count(), 0);
    }

    #[test]
    fn bulk_allocation_does_not_touch_free_list() {
        let mut pool = SlotPool::<u64>::new();

        let single = allocate_one(&mut pool);
        unsafe { pool.deallocate(Some(single), 1) };
        let free_before = pool.free_slots();

        let array = pool.allocate(2).unwrap().unwrap();
        unsafe { pool.deallocate(Some(array), 2) };

        assert_eq!(pool.free_slots(), free_before);
        assert_eq!(allocate_one(&mut pool), single);
    }

    #[test]
    fn bulk_overflow_is_error_and_changes_nothing() {
        let mut pool = SlotPool::<u64>::new();

        let result = pool.allocate(usize::MAX);

        assert!(matches!(result, Err(Error::CapacityOverflow { .. })));
        assert_eq!(pool.large_allocation_count(), 0);
    }

    #[test]
    fn many_bulk_allocations_freed_in_any_order() {
        let mut pool = SlotPool::<u32>::new();

        let regions = (2..50)
            .map(|count| (pool.allocate(count).unwrap(), count))
            .collect::<Vec<_>>();

        assert_eq!(pool.large_allocation_count(), 48);

        for (region, count) in regions.iter().step_by(2) {
            unsafe { pool.deallocate(*region, *count) };
        }

        for (region, count) in regions.iter().skip(1).step_by(2).rev() {
            unsafe { pool.deallocate(*region, *count) };
        }

        assert_eq!(pool.large_allocation_count(), 0);
        assert_eq!(pool.invalid_free_count(), 0);
    }

    #[test]
    fn bulk_unknown_address_is_ignored_and_counted() {
        let mut pool = SlotPool::<u64>::new();
        let array = pool.allocate(3).unwrap();

        let mut local = [0_u64; 3];
        unsafe { pool.deallocate(Some(NonNull::from(&mut local).cast()), 3) };

        assert_eq!(pool.invalid_free_count(), 1);
        assert_eq!(pool.large_allocation_count(), 1);

        unsafe { pool.deallocate(array, 3) };
        assert_eq!(pool.large_allocation_count(), 0);
    }

    #[test]
    fn bulk_double_free_is_ignored_and_counted() {
        let mut pool = SlotPool::<u64>::new();
        let array = pool.allocate(3).unwrap();

        unsafe {
            pool.deallocate(array, 3);
            pool.deallocate(array, 3);
        }

        assert_eq!(pool.invalid_free_count(), 1);
        assert_eq!(pool.large_allocation_count(), 0);
    }

    #[test]
    fn single_slot_freed_as_bulk_is_invalid() {
        let mut pool = SlotPool::<u64>::new();
        let single = pool.allocate(1).unwrap();

        unsafe { pool.deallocate(single, 2) };

        assert_eq!(pool.invalid_free_count(), 1);
        assert_eq!(pool.used_slots(), 1);

        unsafe { pool.deallocate(single, 1) };
        assert!(pool.is_empty());
    }

    #[test]
    #[should_panic]
    fn bulk_unknown_address_panics_with_panic_policy() {
        let mut pool = SlotPool::<u64>::builder()
            .invalid_free_policy(InvalidFreePolicy::Panic)
            .build()
            .unwrap();

        let mut local = [0_u64; 2];
        unsafe { pool.deallocate(Some(NonNull::from(&mut local).cast()), 2) };
    }

    #[test]
    fn null_deallocate_is_noop() {
        let mut pool = SlotPool::<u64>::with_capacity(4).unwrap();

        unsafe {
            pool.deallocate(None, 0);
            pool.deallocate(None, 1);
            pool.deallocate(None, 5);
        }

        assert_eq!(pool.used_slots(), 0);
        assert_eq!(pool.free_slots(), pool.total_slots());
        assert_eq!(pool.invalid_free_count(), 0);
    }

    #[test]
    fn zero_count_deallocate_is_noop() {
        let mut pool = SlotPool::<u64>::new();
        let single = pool.allocate(1).unwrap();

        unsafe { pool.deallocate(single, 0) };

        assert_eq!(pool.used_slots(), 1);
        assert_eq!(pool.invalid_free_count(), 0);

        unsafe { pool.deallocate(single, 1) };
    }

    #[cfg(debug_assertions)]
    #[test]
    fn single_foreign_pointer_is_detected_in_debug_builds() {
        let mut pool = SlotPool::<u64>::new();
        let single = pool.allocate(1).unwrap();

        let mut local = 0_u64;
        unsafe { pool.deallocate(Some(NonNull::from(&mut local)), 1) };

        assert_eq!(pool.invalid_free_count(), 1);
        assert_eq!(pool.used_slots(), 1);
        #[cfg(debug_assertions)]
        pool.integrity_check();

        unsafe { pool.deallocate(single, 1) };
    }

    #[cfg(debug_assertions)]
    #[test]
    fn single_double_free_is_detected_in_debug_builds() {
        let mut pool = SlotPool::<u64>::new();
        let a = pool.allocate(1).unwrap();
        let _b = pool.allocate(1).unwrap();

        unsafe {
            pool.deallocate(a, 1);
            pool.deallocate(a, 1);
        }

        assert_eq!(pool.invalid_free_count(), 1);
        assert_eq!(pool.used_slots(), 1);
        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn invalid_single_frees_are_detected_in_large_pool() {
        const SLOTS: usize = 200_000;

        let mut pool = SlotPool::<u64>::builder()
            .block_size(nz!(4096))
            .build()
            .unwrap();

        let slots = (0..SLOTS)
            .map(|_| allocate_one(&mut pool))
            .collect::<Vec<_>>();

        assert!(pool.block_count() > 1);

        for slot in &slots {
            unsafe { pool.deallocate(Some(*slot), 1) };
        }

        assert_eq!(pool.used_slots(), 0);
        assert_eq!(pool.invalid_free_count(), 0);

        // Every slot is free, so freeing any of them again is a double free.
        unsafe {
            pool.deallocate(Some(slots[0]), 1);
            pool.deallocate(Some(slots[SLOTS / 2]), 1);
            pool.deallocate(Some(slots[SLOTS - 1]), 1);
        }

        assert_eq!(pool.invalid_free_count(), 3);

        let mut local = 0_u64;
        let misaligned = unsafe { slots[SLOTS / 2].byte_add(1) };

        unsafe {
            pool.deallocate(Some(NonNull::from(&mut local)), 1);
            pool.deallocate(Some(misaligned), 1);
        }

        assert_eq!(pool.invalid_free_count(), 5);
        assert_eq!(pool.free_slots(), pool.total_slots());

        pool.integrity_check();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn slots_of_every_block_are_recognized() {
        let mut pool = SlotPool::<u32>::builder()
            .block_size(nz!(3))
            .build()
            .unwrap();

        let slots = (0..30).map(|_| allocate_one(&mut pool)).collect::<Vec<_>>();

        assert_eq!(pool.block_count(), 10);

        for slot in slots.iter().rev() {
            unsafe { pool.deallocate(Some(*slot), 1) };
        }

        assert_eq!(pool.invalid_free_count(), 0);
        assert!(pool.is_empty());

        pool.release_all();

        // Addresses of released blocks are no longer recognized.
        unsafe { pool.deallocate(Some(slots[0]), 1) };

        assert_eq!(pool.invalid_free_count(), 1);
        pool.integrity_check();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn single_double_free_panics_with_panic_policy() {
        let mut pool = SlotPool::<u64>::builder()
            .invalid_free_policy(InvalidFreePolicy::Panic)
            .build()
            .unwrap();

        let a = pool.allocate(1).unwrap();

        unsafe {
            pool.deallocate(a, 1);
            pool.deallocate(a, 1);
        }
    }

    #[test]
    fn take_transfers_everything() {
        let mut source = SlotPool::<u64>::with_capacity(20).unwrap();
        let single = source.allocate(1).unwrap();
        let array = source.allocate(4).unwrap();
        let freed = source.allocate(1).unwrap();
        unsafe { source.deallocate(freed, 1) };

        let mut destination = source.take();

        assert_eq!(destination.total_slots(), 20);
        assert_eq!(destination.used_slots(), 1);
        assert_eq!(destination.free_slots(), 19);
        assert_eq!(destination.large_allocation_count(), 1);

        // The free-list moved along with everything else.
        assert_eq!(destination.allocate(1).unwrap(), freed);

        unsafe {
            destination.deallocate(freed, 1);
            destination.deallocate(single, 1);
            destination.deallocate(array, 4);
        }

        assert!(destination.is_empty());
        assert_eq!(destination.invalid_free_count(), 0);
        #[cfg(debug_assertions)]
        destination.integrity_check();
    }

    #[test]
    fn take_leaves_fresh_pool_behind() {
        let mut source = SlotPool::<u64>::with_capacity(20).unwrap();
        _ = source.allocate(1).unwrap();

        let _destination = source.take();

        assert_eq!(source.total_slots(), 0);
        assert_eq!(source.used_slots(), 0);
        assert_eq!(source.block_count(), 0);
        assert!(source.is_empty());

        _ = allocate_one(&mut source);
        assert_eq!(source.total_slots(), DEFAULT_BLOCK_SIZE.get());
        #[cfg(debug_assertions)]
        source.integrity_check();
    }

    #[test]
    fn take_transfers_identity() {
        let mut source = SlotPool::<u64>::new();
        let source_id = source.pool_id;

        let destination = source.take();

        assert_eq!(destination.pool_id, source_id);
        assert_ne!(source.pool_id, source_id);
        assert_ne!(source, destination);
    }

    #[test]
    fn empty_like_is_independent() {
        let mut pool = SlotPool::<u64>::builder()
            .initial_capacity(100)
            .block_size(nz!(7))
            .build()
            .unwrap();
        _ = pool.allocate(1).unwrap();

        let mut other = pool.empty_like();

        assert_eq!(other.total_slots(), 0);
        assert_eq!(other.used_slots(), 0);
        assert_eq!(other.block_size(), nz!(7));
        assert_ne!(pool, other);

        _ = allocate_one(&mut other);
        assert_eq!(other.total_slots(), 7);
        assert_eq!(pool.total_slots(), 100);
    }

    #[test]
    fn rebind_is_independent_and_keeps_configuration() {
        let pool = SlotPool::<u64>::builder()
            .initial_capacity(10)
            .block_size(nz!(5))
            .invalid_free_policy(InvalidFreePolicy::Panic)
            .build()
            .unwrap();

        let rebound = pool.rebind::<[u8; 3]>();

        assert_eq!(rebound.total_slots(), 0);
        assert_eq!(rebound.config, pool.config);
    }

    #[test]
    #[should_panic]
    fn rebind_to_zst_panics() {
        let pool = SlotPool::<u64>::new();
        drop(pool.rebind::<()>());
    }

    #[test]
    fn equality_is_identity() {
        let a = SlotPool::<u64>::new();
        let b = SlotPool::<u64>::new();

        assert_eq!(a, a);
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic]
    fn zst_is_panic() {
        drop(SlotPool::<()>::new());
    }

    #[test]
    #[should_panic]
    fn drop_with_outstanding_slot_panics_if_policy_forbids() {
        let mut pool = SlotPool::<u64>::builder()
            .release_policy(ReleasePolicy::MustNotReleaseOutstanding)
            .build()
            .unwrap();

        _ = pool.allocate(1).unwrap();
    }

    #[test]
    #[should_panic]
    fn drop_with_outstanding_large_allocation_panics_if_policy_forbids() {
        let mut pool = SlotPool::<u64>::builder()
            .release_policy(ReleasePolicy::MustNotReleaseOutstanding)
            .build()
            .unwrap();

        _ = pool.allocate(2).unwrap();
    }

    #[test]
    #[should_panic]
    fn release_all_with_outstanding_panics_if_policy_forbids() {
        let mut pool = SlotPool::<u64>::builder()
            .release_policy(ReleasePolicy::MustNotReleaseOutstanding)
            .build()
            .unwrap();

        _ = pool.allocate(1).unwrap();
        pool.release_all();
    }

    #[test]
    fn drop_without_outstanding_is_fine_if_policy_forbids() {
        let mut pool = SlotPool::<u64>::builder()
            .release_policy(ReleasePolicy::MustNotReleaseOutstanding)
            .initial_capacity(10)
            .build()
            .unwrap();

        let single = pool.allocate(1).unwrap();
        let array = pool.allocate(3).unwrap();

        unsafe {
            pool.deallocate(single, 1);
            pool.deallocate(array, 3);
        }

        pool.release_all();
        drop(pool);
    }

    #[test]
    fn drop_with_outstanding_is_fine_by_default() {
        let mut pool = SlotPool::<String>::new();

        let slot = allocate_one(&mut pool);
        unsafe { slot.write("leaked on purpose".to_string()) };
        _ = pool.allocate(3).unwrap();

        drop(pool);
    }

    #[test]
    fn in_refcell_works_fine() {
        let pool = std::cell::RefCell::new(SlotPool::<u32>::new());

        let slot = pool.borrow_mut().allocate(1).unwrap();
        assert_eq!(pool.borrow().used_slots(), 1);

        unsafe { pool.borrow_mut().deallocate(slot, 1) };
        assert!(pool.borrow().is_empty());
    }

    #[test]
    fn multithreaded_via_mutex() {
        let shared_pool = Arc::new(Mutex::new(SlotPool::<u64>::new()));

        thread::spawn({
            let shared_pool = Arc::clone(&shared_pool);
            move || {
                let mut pool = shared_pool.lock().unwrap();

                let slot = pool.allocate(1).unwrap();
                unsafe { pool.deallocate(slot, 1) };
            }
        })
        .join()
        .unwrap();

        let pool = shared_pool.lock().unwrap();
        assert_eq!(pool.total_slots(), DEFAULT_BLOCK_SIZE.get());
        assert!(pool.is_empty());
    }
}
