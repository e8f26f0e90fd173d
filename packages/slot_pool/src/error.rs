use thiserror::Error;

/// Errors that can occur when a [`SlotPool`][crate::SlotPool] obtains memory.
///
/// Deallocation never fails. Frees the pool cannot account for are handled by the
/// [invalid free policy][crate::InvalidFreePolicy] instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The system allocator could not satisfy a request for memory.
    ///
    /// The pool is left exactly as it was before the failed operation.
    #[error("out of memory: the system allocator could not provide {bytes} bytes")]
    OutOfMemory {
        /// Size of the request that could not be satisfied.
        bytes: usize,
    },

    /// The requested number of items cannot be described as a valid memory layout.
    #[error(
        "capacity overflow: {count} items of {item_size} bytes each exceed the addressable memory range"
    )]
    CapacityOverflow {
        /// Number of items that was requested.
        count: usize,

        /// Size of one item in bytes.
        item_size: usize,
    },
}

/// A specialized `Result` type for slot pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn out_of_memory_mentions_size() {
        let error = Error::OutOfMemory { bytes: 4096 };

        assert!(error.to_string().contains("4096 bytes"));
    }

    #[test]
    fn capacity_overflow_mentions_request() {
        let error = Error::CapacityOverflow {
            count: 7,
            item_size: 8,
        };

        let message = error.to_string();
        assert!(message.contains("7 items"));
        assert!(message.contains("8 bytes"));
    }
}
