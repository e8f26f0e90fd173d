use std::marker::PhantomData;
use std::num::NonZero;

use crate::{DEFAULT_BLOCK_SIZE, InvalidFreePolicy, ReleasePolicy, Result, SlotPool};

/// Builder for creating an instance of [`SlotPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`SlotPool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use slot_pool::{InvalidFreePolicy, SlotPool};
///
/// let pool = SlotPool::<u32>::builder()
///     .initial_capacity(100)
///     .block_size(nz!(64))
///     .invalid_free_policy(InvalidFreePolicy::Panic)
///     .build()
///     .unwrap();
///
/// assert!(pool.total_slots() >= 100);
/// ```
///
/// [1]: SlotPool::new
#[must_use]
pub struct SlotPoolBuilder<T> {
    config: PoolConfig,
    initial_capacity: usize,

    _item: PhantomData<T>,
}

/// The part of the configuration that a pool keeps for its whole lifetime and passes on to the
/// independent pools derived from it via `empty_like()` and `rebind()`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct PoolConfig {
    pub(crate) block_size: NonZero<usize>,
    pub(crate) invalid_free_policy: InvalidFreePolicy,
    pub(crate) release_policy: ReleasePolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            invalid_free_policy: InvalidFreePolicy::default(),
            release_policy: ReleasePolicy::default(),
        }
    }
}

impl<T> std::fmt::Debug for SlotPoolBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("config", &self.config)
            .field("initial_capacity", &self.initial_capacity)
            .finish()
    }
}

impl<T> SlotPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            config: PoolConfig::default(),
            initial_capacity: 0,
            _item: PhantomData,
        }
    }

    /// Sets the number of slots to reserve when the pool is built.
    ///
    /// The reservation is rounded up to at least one block. Zero (the default) means the pool
    /// starts without any blocks and allocates its first block on first use.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u64>::builder()
    ///     .initial_capacity(10)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.total_slots(), 16);
    /// ```
    pub fn initial_capacity(mut self, slots: usize) -> Self {
        self.initial_capacity = slots;
        self
    }

    /// Sets the minimum number of slots in each block the pool allocates.
    ///
    /// Larger requests via [`reserve()`][SlotPool::reserve] may still produce larger blocks.
    /// Defaults to [`DEFAULT_BLOCK_SIZE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use new_zealand::nz;
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u64>::builder()
    ///     .block_size(nz!(4))
    ///     .build()
    ///     .unwrap();
    ///
    /// let slot = pool.allocate(1).unwrap();
    /// assert_eq!(pool.total_slots(), 4);
    /// # unsafe { pool.deallocate(slot, 1) };
    /// ```
    pub fn block_size(mut self, slots: NonZero<usize>) -> Self {
        self.config.block_size = slots;
        self
    }

    /// Sets the [invalid free policy][InvalidFreePolicy] for the pool. This governs what happens
    /// when the pool is asked to free memory it cannot account for.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{InvalidFreePolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u64>::builder()
    ///     .invalid_free_policy(InvalidFreePolicy::Panic)
    ///     .build()
    ///     .unwrap();
    /// # drop(pool);
    /// ```
    pub fn invalid_free_policy(mut self, policy: InvalidFreePolicy) -> Self {
        self.config.invalid_free_policy = policy;
        self
    }

    /// Sets the [release policy][ReleasePolicy] for the pool. This governs how to treat
    /// outstanding allocations when the pool releases its memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{ReleasePolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u64>::builder()
    ///     .release_policy(ReleasePolicy::MustNotReleaseOutstanding)
    ///     .build()
    ///     .unwrap();
    /// # drop(pool);
    /// ```
    pub fn release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.config.release_policy = policy;
        self
    }

    /// Builds the slot pool with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial capacity cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::builder().build().unwrap();
    /// assert_eq!(pool.total_slots(), 0);
    /// ```
    pub fn build(self) -> Result<SlotPool<T>> {
        let mut pool = SlotPool::new_inner(self.config);

        if self.initial_capacity > 0 {
            pool.reserve(self.initial_capacity)?;
        }

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn builder_new_creates_default_state() {
        let builder = SlotPoolBuilder::<u64>::new();

        assert_eq!(builder.config, PoolConfig::default());
        assert_eq!(builder.config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(builder.initial_capacity, 0);
    }

    #[test]
    fn setters_are_applied() {
        let builder = SlotPoolBuilder::<u64>::new()
            .initial_capacity(5)
            .block_size(nz!(3))
            .invalid_free_policy(InvalidFreePolicy::Panic)
            .release_policy(ReleasePolicy::MustNotReleaseOutstanding);

        assert_eq!(builder.initial_capacity, 5);
        assert_eq!(builder.config.block_size, nz!(3));
        assert_eq!(
            builder.config.invalid_free_policy,
            InvalidFreePolicy::Panic
        );
        assert_eq!(
            builder.config.release_policy,
            ReleasePolicy::MustNotReleaseOutstanding
        );
    }

    #[test]
    fn build_without_capacity_allocates_nothing() {
        let pool = SlotPoolBuilder::<u64>::new().build().unwrap();

        assert_eq!(pool.total_slots(), 0);
        assert_eq!(pool.block_count(), 0);
    }

    #[test]
    fn build_with_capacity_reserves() {
        let pool = SlotPoolBuilder::<u64>::new()
            .initial_capacity(20)
            .build()
            .unwrap();

        assert_eq!(pool.total_slots(), 20);
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn build_with_overflowing_capacity_is_error() {
        let result = SlotPoolBuilder::<u64>::new()
            .initial_capacity(usize::MAX)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn debug_mentions_item_type() {
        let builder = SlotPoolBuilder::<u64>::new();

        assert!(format!("{builder:?}").contains("u64"));
    }

    #[test]
    #[should_panic]
    fn zst_is_panic() {
        drop(SlotPoolBuilder::<()>::new().build());
    }
}
