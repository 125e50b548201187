use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;
use std::thread;

use crate::reclaiming_store::Fallback;
use crate::{ErasedValue, ReclaimPolicy, ReclaimingStore};

/// Builder for creating an instance of [`ReclaimingStore`].
///
/// All settings are optional. By default the store has one shard per available processor,
/// uses [`ReclaimPolicy::Manual`] and has no fallback hook.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use recycling_pool::{ReclaimPolicy, ReclaimingStore};
///
/// // Default store.
/// let store = ReclaimingStore::builder().build();
///
/// // Single shard, reclaiming after every 64 releases, creating empty strings on a miss.
/// let store = ReclaimingStore::builder()
///     .shard_count(NonZero::new(1).unwrap())
///     .reclaim_policy(ReclaimPolicy::EveryReleases(NonZero::new(64).unwrap()))
///     .fallback(|| Some(Box::new(String::new())))
///     .build();
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]).
#[must_use]
pub struct ReclaimingStoreBuilder {
    shard_count: Option<NonZero<usize>>,
    reclaim_policy: ReclaimPolicy,
    fallback: Option<Fallback>,

    _not_sync: PhantomData<Cell<()>>,
}

impl ReclaimingStoreBuilder {
    pub(crate) fn new() -> Self {
        Self {
            shard_count: None,
            reclaim_policy: ReclaimPolicy::default(),
            fallback: None,
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of independently locked shards.
    ///
    /// Defaults to the available parallelism reported by the operating system.
    pub fn shard_count(mut self, count: NonZero<usize>) -> Self {
        self.shard_count = Some(count);
        self
    }

    /// Sets the [reclamation policy][ReclaimPolicy] that governs automatic reclamation cycles.
    pub fn reclaim_policy(mut self, policy: ReclaimPolicy) -> Self {
        self.reclaim_policy = policy;
        self
    }

    /// Sets the hook that the store invokes when it has no idle value to hand out.
    ///
    /// The hook may be invoked concurrently from multiple threads. It may return `None`, in
    /// which case the acquire reports that there is nothing to offer.
    pub fn fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn() -> Option<ErasedValue> + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Builds the store with the specified configuration.
    #[must_use]
    pub fn build(self) -> ReclaimingStore {
        let shard_count = self
            .shard_count
            .unwrap_or_else(|| thread::available_parallelism().unwrap_or(NonZero::<usize>::MIN));

        ReclaimingStore::new_inner(shard_count, self.reclaim_policy, self.fallback)
    }
}

impl fmt::Debug for ReclaimingStoreBuilder {
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReclaimingStoreBuilder")
            .field("shard_count", &self.shard_count)
            .field("reclaim_policy", &self.reclaim_policy)
            .field("has_fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}
