//! A typed memory pool that hands out uninitialized, fixed-size slots for values of one type.
//!
//! This crate provides [`SlotPool`], a single-threaded allocator intended as the element storage of
//! node-based containers (lists, trees, hash maps with chained buckets) that repeatedly allocate
//! and free individual elements of the same type.
//!
//! # Key Features
//!
//! - **Typed slots**: Every slot is sized and aligned for exactly one `T`
//! - **Constant-time reuse**: Freed slots go on top of a free-list and are handed out again first
//! - **Block growth**: Slots are carved out of blocks of at least [`DEFAULT_BLOCK_SIZE`] slots,
//!   allocated only when no free slot remains
//! - **Array fallback**: Requests for several contiguous items are served by dedicated
//!   allocations tracked by address
//! - **Bulk release**: All memory is returned at once when the pool is released or dropped
//! - **Allocator contract**: The [`ElementAllocator`] trait lets generic containers work with
//!   any allocator of the same shape
//! - **Configurable policies**: Decide what happens on invalid frees and when memory is released
//!   while still in use
//! - **Thread mobility**: The pool can be moved between threads (but not shared without
//!   synchronization)
//!
//! The pool never constructs, reads or drops values. Callers write values into the memory they
//! obtain and are responsible for dropping them before returning the memory.
//!
//! # Examples
//!
//! ## Single Slots
//!
//! ```rust
//! use slot_pool::SlotPool;
//!
//! let mut pool = SlotPool::<u64>::new();
//!
//! let a = pool.allocate(1).unwrap().unwrap();
//! let b = pool.allocate(1).unwrap().unwrap();
//!
//! // SAFETY: Both slots are sized and aligned for u64 and belong to us.
//! unsafe {
//!     a.write(1);
//!     b.write(2);
//!     assert_eq!(a.read() + b.read(), 3);
//! }
//!
//! // The most recently freed slot is the next one handed out.
//! // SAFETY: The slot was allocated by this pool and u64 needs no dropping.
//! unsafe { pool.deallocate(Some(a), 1) };
//! assert_eq!(pool.allocate(1).unwrap(), Some(a));
//! ```
//!
//! ## Contiguous Items
//!
//! ```rust
//! use slot_pool::SlotPool;
//!
//! let mut pool = SlotPool::<u32>::new();
//!
//! let array = pool.allocate(4).unwrap().unwrap();
//!
//! // SAFETY: The allocation has room for 4 items of u32.
//! unsafe {
//!     for index in 0..4 {
//!         array.add(index).write(index as u32);
//!     }
//!
//!     pool.deallocate(Some(array), 4);
//! }
//!
//! assert_eq!(pool.large_allocation_count(), 0);
//! ```
//!
//! ## Sizing Up Front
//!
//! ```rust
//! use slot_pool::SlotPool;
//!
//! let mut pool = SlotPool::<u64>::with_capacity(1000).unwrap();
//!
//! for _ in 0..1000 {
//!     _ = pool.allocate(1).unwrap();
//! }
//!
//! // Everything fit into the initial block.
//! assert_eq!(pool.block_count(), 1);
//! ```

mod block;
mod builder;
mod contract;
mod error;
mod free_list;
mod large;
mod policy;
mod pool;
mod request;

pub(crate) use block::*;
pub use builder::SlotPoolBuilder;
pub(crate) use builder::PoolConfig;
pub use contract::ElementAllocator;
pub use error::Error;
pub(crate) use error::Result;
pub(crate) use free_list::*;
pub(crate) use large::*;
pub(crate) use policy::InvalidFree;
pub use policy::{InvalidFreePolicy, ReleasePolicy};
pub use pool::{DEFAULT_BLOCK_SIZE, SlotPool};
pub(crate) use request::*;
