use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{ReclaimPolicy, ReclaimingStore, ReclaimingStoreBuilder, RecyclingPool};

/// Builder for creating an instance of [`RecyclingPool`] backed by a [`ReclaimingStore`].
///
/// The factory that creates new values is provided to [`build()`][Self::build]; all other
/// settings are optional.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use recycling_pool::{ReclaimPolicy, RecyclingPool};
///
/// // Default configuration.
/// let pool = RecyclingPool::builder().build(String::new);
///
/// // Two shards, reclaiming idle buffers after every 128 releases.
/// let pool = RecyclingPool::builder()
///     .shard_count(NonZero::new(2).unwrap())
///     .reclaim_policy(ReclaimPolicy::EveryReleases(NonZero::new(128).unwrap()))
///     .build(|| Vec::<u8>::with_capacity(4096));
/// ```
#[must_use]
pub struct RecyclingPoolBuilder<T> {
    store: ReclaimingStoreBuilder,

    _values: PhantomData<fn() -> T>,
}

impl<T> RecyclingPoolBuilder<T>
where
    T: Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            store: ReclaimingStore::builder(),
            _values: PhantomData,
        }
    }

    /// Sets the number of independently locked shards in the backing store.
    ///
    /// Defaults to the available parallelism reported by the operating system.
    pub fn shard_count(mut self, count: NonZero<usize>) -> Self {
        self.store = self.store.shard_count(count);
        self
    }

    /// Sets the [reclamation policy][ReclaimPolicy] of the backing store.
    pub fn reclaim_policy(mut self, policy: ReclaimPolicy) -> Self {
        self.store = self.store.reclaim_policy(policy);
        self
    }

    /// Builds the pool, using `new_func` to create a value whenever the store has none idle.
    ///
    /// `new_func` is not called here. It may later be called concurrently from multiple
    /// threads when several callers find the store empty at the same time.
    pub fn build<F>(self, new_func: F) -> RecyclingPool<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let store = self
            .store
            .fallback(move || Some(Box::new(new_func())))
            .build();

        RecyclingPool::from_store(store)
    }
}

impl<T> fmt::Debug for RecyclingPoolBuilder<T> {
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("store", &self.store)
            .finish()
    }
}
