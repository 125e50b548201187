use std::num::NonZero;

/// Determines when a [`ReclaimingStore`][crate::ReclaimingStore] runs reclamation cycles on
/// its own initiative.
///
/// Every reclamation cycle drops the values that have been idle since the previous cycle and
/// demotes the remaining idle values so they are dropped by the next cycle unless reacquired.
/// Cycles can always be triggered explicitly via
/// [`ReclaimingStore::reclaim()`][crate::ReclaimingStore::reclaim], regardless of policy.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use recycling_pool::{ReclaimPolicy, RecyclingPool};
///
/// let pool = RecyclingPool::builder()
///     .reclaim_policy(ReclaimPolicy::EveryReleases(NonZero::new(1024).unwrap()))
///     .build(Vec::<u8>::new);
/// # drop(pool);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReclaimPolicy {
    /// Reclamation only happens when the owner calls `reclaim()`. This is the default.
    #[default]
    Manual,

    /// A reclamation cycle runs after every N-th release into the store, counted across
    /// all threads.
    EveryReleases(NonZero<u32>),
}
