#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! This package provides [`RecyclingPool`], a thread-safe pool of interchangeable values that
//! lets hot code paths reuse buffers and scratch structures instead of allocating new ones.
//!
//! # Features
//!
//! - **Typed API over an untyped store**: values go in and come out as `T`, the type check
//!   happens once inside the pool.
//! - **Never fails**: if the store has nothing usable, `acquire()` returns `T::default()`.
//! - **Thread-safe**: any number of threads may acquire and release concurrently.
//! - **Self-trimming**: the default [`ReclaimingStore`] drops values that stay idle for two
//!   reclamation cycles.
//! - **Pluggable store**: implement [`Store`] to change how idle values are kept.
//!
//! The pool does not reset released values and does not limit how many values it keeps.
//!
//! # Example
//!
//! ```rust
//! use recycling_pool::RecyclingPool;
//!
//! let pool = RecyclingPool::new(|| Vec::<u8>::with_capacity(4096));
//!
//! let mut buffer = pool.acquire();
//! buffer.extend_from_slice(b"request payload");
//!
//! // ... use the buffer ...
//!
//! buffer.clear();
//! pool.release(buffer);
//!
//! // The next acquire reuses the allocation.
//! let buffer = pool.acquire();
//! assert!(buffer.capacity() >= 4096);
//! ```
//!
//! With a guard that releases automatically:
//!
//! ```rust
//! use recycling_pool::RecyclingPool;
//!
//! let pool = RecyclingPool::new(String::new);
//!
//! {
//!     let mut text = pool.checkout();
//!     text.push_str("scratch");
//!     text.clear();
//! } // Released here.
//!
//! assert_eq!(pool.store().len(), 1);
//! ```
//!
//! # Observability
//!
//! Reclamation cycles are logged via `tracing` at debug level. Acquire hits and misses,
//! releases, reclaimed values and zero value fallbacks are recorded as `nm` events named
//! `recycling_pool_*`.

mod builder;
mod checked_out;
mod metrics;
mod pool;
mod reclaim_policy;
mod reclaiming_store;
mod store;
mod store_builder;

pub use builder::*;
pub use checked_out::*;
pub use pool::*;
pub use reclaim_policy::*;
pub use reclaiming_store::ReclaimingStore;
pub use store::*;
pub use store_builder::*;
