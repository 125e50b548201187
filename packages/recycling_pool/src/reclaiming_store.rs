use std::any::type_name;
use std::fmt;
use std::mem;
use std::num::NonZero;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::metrics::{ACQUIRE_HITS, ACQUIRE_MISSES, RECLAIMED_VALUES, RELEASES};
use crate::{ErasedValue, ReclaimPolicy, ReclaimingStoreBuilder, Store};

/// Produces a value when the store has no idle value to hand out.
pub(crate) type Fallback = Box<dyn Fn() -> Option<ErasedValue> + Send + Sync>;

// Threads are spread over the shards in the order they first touch any store.
static NEXT_HOME_SHARD: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static HOME_SHARD: usize = NEXT_HOME_SHARD.fetch_add(1, Ordering::Relaxed);
}

/// The default [`Store`]: a sharded cache of idle values that discards values which stay idle
/// for too long.
///
/// # Sharding
///
/// The store is split into independently locked shards. Each thread has a home shard that it
/// releases values into and acquires from first. If the home shard is empty, the other shards
/// are searched before the store reports a miss, so a value released on one thread can be
/// acquired on another.
///
/// The search over the shards is not atomic. With more than one shard, a value released into a
/// shard the search has already passed is missed, so a concurrent acquire may invoke the
/// fallback hook even though an idle value exists. Use a single shard if the number of values
/// created must be strictly bounded by peak demand.
///
/// # Reclamation
///
/// Idle values live in one of two generations. Values are released into the primary
/// generation. A reclamation cycle drops everything in the victim generation and demotes the
/// primary generation to become the new victim generation. An idle value therefore survives
/// one cycle and is dropped by the second one unless somebody acquires it in between.
///
/// Cycles run when [`reclaim()`][Self::reclaim] is called and additionally as dictated by the
/// [`ReclaimPolicy`] the store was built with.
///
/// # Fallback
///
/// When every shard is empty, the store invokes its fallback hook, if one was configured via
/// [`ReclaimingStoreBuilder::fallback()`]. Without a hook, a miss returns `None`.
///
/// # Example
///
/// ```
/// use recycling_pool::{ReclaimingStore, Store};
///
/// let store = ReclaimingStore::new();
///
/// store.release(Box::new(42_u32));
/// assert_eq!(store.len(), 1);
///
/// // The first cycle only demotes the value.
/// assert_eq!(store.reclaim(), 0);
/// assert_eq!(store.len(), 1);
///
/// // The second cycle drops it.
/// assert_eq!(store.reclaim(), 1);
/// assert!(store.is_empty());
/// ```
pub struct ReclaimingStore {
    shards: Box<[Mutex<Shard>]>,
    shard_count: NonZero<usize>,

    fallback: Option<Fallback>,

    reclaim_policy: ReclaimPolicy,
    releases_since_reclaim: AtomicU32,
}

#[derive(Default)]
struct Shard {
    primary: Vec<ErasedValue>,
    victim: Vec<ErasedValue>,
}

impl Shard {
    fn pop(&mut self) -> Option<ErasedValue> {
        self.primary.pop().or_else(|| self.victim.pop())
    }

    fn len(&self) -> usize {
        self.primary.len().saturating_add(self.victim.len())
    }
}

impl ReclaimingStore {
    /// Creates a store with default configuration and no fallback hook.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::{ReclaimingStore, Store};
    ///
    /// let store = ReclaimingStore::new();
    /// assert!(store.acquire().is_none());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder for creating a [`ReclaimingStore`] with custom configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use recycling_pool::ReclaimingStore;
    ///
    /// let store = ReclaimingStore::builder()
    ///     .shard_count(NonZero::new(4).unwrap())
    ///     .fallback(|| Some(Box::new(String::new())))
    ///     .build();
    /// # drop(store);
    /// ```
    pub fn builder() -> ReclaimingStoreBuilder {
        ReclaimingStoreBuilder::new()
    }

    pub(crate) fn new_inner(
        shard_count: NonZero<usize>,
        reclaim_policy: ReclaimPolicy,
        fallback: Option<Fallback>,
    ) -> Self {
        let shards = (0..shard_count.get())
            .map(|_| Mutex::new(Shard::default()))
            .collect();

        Self {
            shards,
            shard_count,
            fallback,
            reclaim_policy,
            releases_since_reclaim: AtomicU32::new(0),
        }
    }

    /// Runs a reclamation cycle and returns the number of idle values that were dropped.
    ///
    /// Values that were idle at the previous cycle and have not been acquired since are
    /// dropped. All other idle values are demoted and will be dropped by the next cycle unless
    /// acquired before then.
    ///
    /// The dropped values are dropped after the shard locks have been released, so their
    /// `Drop` implementations may freely use the store.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::RecyclingPool;
    ///
    /// let pool = RecyclingPool::new(|| vec![0_u8; 1024]);
    ///
    /// let buffer = pool.acquire();
    /// pool.release(buffer);
    ///
    /// pool.store().reclaim();
    /// assert_eq!(pool.store().reclaim(), 1);
    /// ```
    pub fn reclaim(&self) -> usize {
        let mut expired = Vec::new();

        for shard in &self.shards {
            let mut shard = shard.lock();

            let demoted = mem::take(&mut shard.primary);
            let victim = mem::replace(&mut shard.victim, demoted);

            if !victim.is_empty() {
                expired.push(victim);
            }
        }

        let reclaimed = expired.iter().map(Vec::len).sum::<usize>();

        // Only now, with no shard lock held, do the expired values get dropped.
        drop(expired);

        debug!(reclaimed, "reclamation cycle completed");
        _ = RECLAIMED_VALUES.try_with(|e| e.observe(reclaimed));

        reclaimed
    }

    /// Returns the number of idle values currently held by the store.
    ///
    /// Other threads may acquire and release concurrently, so the result is only a snapshot.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::{ReclaimingStore, Store};
    ///
    /// let store = ReclaimingStore::new();
    /// assert_eq!(store.len(), 0);
    ///
    /// store.release(Box::new("hello"));
    /// store.release(Box::new("world"));
    /// assert_eq!(store.len(), 2);
    /// ```
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().len())
            .fold(0, usize::saturating_add)
    }

    /// Returns whether the store holds no idle values.
    ///
    /// Other threads may acquire and release concurrently, so the result is only a snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().len() == 0)
    }

    /// Returns the number of shards the store is split into.
    #[must_use]
    pub fn shard_count(&self) -> NonZero<usize> {
        self.shard_count
    }

    /// Returns the reclamation policy the store was built with.
    #[must_use]
    pub fn reclaim_policy(&self) -> ReclaimPolicy {
        self.reclaim_policy
    }

    fn home_shard_index(&self) -> usize {
        // The hint may be gone if we are called from another thread-local's destructor.
        // Any shard is as good as another in that case.
        let hint = HOME_SHARD.try_with(|hint| *hint).unwrap_or_default();

        hint % self.shard_count
    }

    /// Counts a release and returns whether it completes a reclamation interval.
    fn release_completes_interval(&self) -> bool {
        let ReclaimPolicy::EveryReleases(interval) = self.reclaim_policy else {
            return false;
        };

        let (Ok(previous) | Err(previous)) = self.releases_since_reclaim.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |count| {
                let count = count.saturating_add(1);
                Some(if count >= interval.get() { 0 } else { count })
            },
        );

        previous.saturating_add(1) >= interval.get()
    }
}

impl Store for ReclaimingStore {
    fn acquire(&self) -> Option<ErasedValue> {
        let home = self.home_shard_index();

        // Home shard first, then every other shard in turn.
        let idle = self
            .shards
            .iter()
            .cycle()
            .skip(home)
            .take(self.shard_count.get())
            .find_map(|shard| shard.lock().pop());

        if idle.is_some() {
            _ = ACQUIRE_HITS.try_with(|e| e.observe_once());
            return idle;
        }

        _ = ACQUIRE_MISSES.try_with(|e| e.observe_once());
        trace!(home, "no idle value in any shard");

        self.fallback.as_ref().and_then(|fallback| fallback())
    }

    #[expect(
        clippy::indexing_slicing,
        reason = "the home shard index is always reduced modulo the shard count"
    )]
    fn release(&self, value: ErasedValue) {
        let home = self.home_shard_index();

        self.shards[home].lock().primary.push(value);

        _ = RELEASES.try_with(|e| e.observe_once());

        if self.release_completes_interval() {
            trace!(home, "release interval reached, reclaiming");
            self.reclaim();
        }
    }
}

impl Default for ReclaimingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReclaimingStore {
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("shard_count", &self.shard_count)
            .field("reclaim_policy", &self.reclaim_policy)
            .field("has_fallback", &self.fallback.is_some())
            .field("idle", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ReclaimingStore: Send, Sync);

    fn acquire_u32(store: &ReclaimingStore) -> Option<u32> {
        store
            .acquire()
            .map(|value| *value.downcast::<u32>().expect("test stores only hold u32"))
    }

    #[test]
    fn empty_store_without_fallback_returns_none() {
        let store = ReclaimingStore::new();

        assert!(store.acquire().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn fallback_invoked_only_on_miss() {
        let calls = Arc::new(AtomicUsize::new(0));

        let store = ReclaimingStore::builder()
            .fallback({
                let calls = Arc::clone(&calls);
                move || {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Some(Box::new(7_u32))
                }
            })
            .build();

        assert_eq!(calls.load(Ordering::Relaxed), 0);

        assert_eq!(acquire_u32(&store), Some(7));
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        store.release(Box::new(99_u32));

        assert_eq!(acquire_u32(&store), Some(99));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn fallback_may_yield_nothing() {
        let store = ReclaimingStore::builder().fallback(|| None).build();

        assert!(store.acquire().is_none());
    }

    #[test]
    fn released_values_are_returned_most_recent_first() {
        let store = ReclaimingStore::builder()
            .shard_count(NonZero::new(1).unwrap())
            .build();

        store.release(Box::new(1_u32));
        store.release(Box::new(2_u32));
        assert_eq!(store.len(), 2);

        assert_eq!(acquire_u32(&store), Some(2));
        assert_eq!(acquire_u32(&store), Some(1));
        assert_eq!(acquire_u32(&store), None);
    }

    #[test]
    fn idle_value_survives_one_reclaim_cycle() {
        let store = ReclaimingStore::new();

        store.release(Box::new(5_u32));

        assert_eq!(store.reclaim(), 0);
        assert_eq!(store.len(), 1);

        assert_eq!(acquire_u32(&store), Some(5));
    }

    #[test]
    fn idle_value_dropped_by_second_reclaim_cycle() {
        let store = ReclaimingStore::new();

        store.release(Box::new(5_u32));

        assert_eq!(store.reclaim(), 0);
        assert_eq!(store.reclaim(), 1);

        assert!(store.is_empty());
        assert_eq!(acquire_u32(&store), None);
    }

    #[test]
    fn reacquired_value_is_promoted_on_release() {
        let store = ReclaimingStore::new();

        store.release(Box::new(5_u32));
        store.reclaim();

        // Taking it out of the victim generation and putting it back resets its age.
        let value = store.acquire().unwrap();
        store.release(value);

        assert_eq!(store.reclaim(), 0);
        assert_eq!(acquire_u32(&store), Some(5));
    }

    #[test]
    fn every_releases_policy_reclaims_on_interval() {
        let store = ReclaimingStore::builder()
            .shard_count(NonZero::new(1).unwrap())
            .reclaim_policy(ReclaimPolicy::EveryReleases(NonZero::new(2).unwrap()))
            .build();

        store.release(Box::new(1_u32));
        assert_eq!(store.len(), 1);

        // Second release completes the interval: both values are demoted, none dropped.
        store.release(Box::new(2_u32));
        assert_eq!(store.len(), 2);

        store.release(Box::new(3_u32));

        // Fourth release completes the next interval: values 1 and 2 were victims.
        store.release(Box::new(4_u32));
        assert_eq!(store.len(), 2);

        assert_eq!(acquire_u32(&store), Some(4));
        assert_eq!(acquire_u32(&store), Some(3));
        assert_eq!(acquire_u32(&store), None);
    }

    #[test]
    fn manual_policy_never_reclaims_on_its_own() {
        let store = ReclaimingStore::new();

        for i in 0..100_u32 {
            store.release(Box::new(i));
        }

        assert_eq!(store.len(), 100);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn value_released_on_other_thread_is_found() {
        let store = Arc::new(
            ReclaimingStore::builder()
                .shard_count(NonZero::new(8).unwrap())
                .build(),
        );

        thread::spawn({
            let store = Arc::clone(&store);
            move || store.release(Box::new(123_u32))
        })
        .join()
        .unwrap();

        assert_eq!(acquire_u32(&store), Some(123));
    }

    #[test]
    fn reclaim_drops_values_outside_shard_locks() {
        struct InspectsStoreOnDrop {
            store: Arc<ReclaimingStore>,
            dropped: Arc<AtomicUsize>,
        }

        impl Drop for InspectsStoreOnDrop {
            fn drop(&mut self) {
                // Would deadlock if the shard lock were still held.
                _ = self.store.len();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }

        let store = Arc::new(ReclaimingStore::new());
        let dropped = Arc::new(AtomicUsize::new(0));

        store.release(Box::new(InspectsStoreOnDrop {
            store: Arc::clone(&store),
            dropped: Arc::clone(&dropped),
        }));

        store.reclaim();
        assert_eq!(store.reclaim(), 1);
        assert_eq!(dropped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn accessors_report_configuration() {
        let store = ReclaimingStore::builder()
            .shard_count(NonZero::new(3).unwrap())
            .reclaim_policy(ReclaimPolicy::EveryReleases(NonZero::new(10).unwrap()))
            .build();

        assert_eq!(store.shard_count().get(), 3);
        assert_eq!(
            store.reclaim_policy(),
            ReclaimPolicy::EveryReleases(NonZero::new(10).unwrap())
        );
    }
}
