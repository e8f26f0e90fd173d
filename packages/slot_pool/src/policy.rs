use std::fmt;

/// Determines what the pool does when asked to free memory it cannot account for.
///
/// An invalid free is a deallocation of an address that the pool never handed out through the
/// matching allocation path, or one that was already returned to the pool. Large (multi-item)
/// frees are always checked. Single-slot frees are checked in debug builds only, as checking them
/// requires a scan of the pool's blocks.
///
/// By default, invalid frees are logged, counted and otherwise ignored.
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
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum InvalidFreePolicy {
    /// The free is ignored after being logged and counted in
    /// [`invalid_free_count()`][crate::SlotPool::invalid_free_count]. This is the default.
    #[default]
    Ignore,

    /// The pool panics. Useful in tests to surface double frees and foreign pointers.
    Panic,
}

/// Determines how the pool treats outstanding allocations when its memory is released, either
/// explicitly via [`release_all()`][crate::SlotPool::release_all] or by dropping the pool.
///
/// The pool never drops items stored in its slots, so releasing memory that still holds live
/// items leaks whatever resources those items own.
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
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReleasePolicy {
    /// Memory is released regardless of outstanding allocations. This is the default.
    #[default]
    MayReleaseOutstanding,

    /// The pool will panic if any single slot or large allocation is still outstanding when its
    /// memory is released. The memory itself is released before the panic.
    ///
    /// This may be valuable if callers are expected to return every allocation before the pool
    /// goes away, e.g. because items in the pool own resources that must be cleaned up.
    MustNotReleaseOutstanding,
}

/// The reason a deallocation was classified as an invalid free.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum InvalidFree {
    /// The address does not belong to the allocation path selected by the item count.
    UnknownAddress,

    /// The slot is already on the free-list.
    #[cfg_attr(
        not(debug_assertions),
        allow(dead_code, reason = "only detected in debug builds")
    )]
    AlreadyFree,
}

impl fmt::Display for InvalidFree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAddress => f.write_str("address was not allocated by this pool"),
            Self::AlreadyFree => f.write_str("slot was already free"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lenient() {
        assert_eq!(InvalidFreePolicy::default(), InvalidFreePolicy::Ignore);
        assert_eq!(ReleasePolicy::default(), ReleasePolicy::MayReleaseOutstanding);
    }

    #[test]
    fn invalid_free_display() {
        assert_eq!(
            InvalidFree::UnknownAddress.to_string(),
            "address was not allocated by this pool"
        );
        assert_eq!(InvalidFree::AlreadyFree.to_string(), "slot was already free");
    }
}
