//! Metrics for the recycling pool.
//!
//! The events are thread-local to keep the acquire and release paths free of shared counters.
//!
//! Always record via `try_with()`. The pool may be used from another thread-local's destructor,
//! after these events are already gone, and such observations are silently lost.

use nm::Event;

thread_local! {
    /// An acquire was served from an idle value held by the store.
    pub(crate) static ACQUIRE_HITS: Event = Event::builder()
        .name("recycling_pool_acquire_hits")
        .build();

    /// An acquire found no idle value and fell through to the fallback hook (if any).
    pub(crate) static ACQUIRE_MISSES: Event = Event::builder()
        .name("recycling_pool_acquire_misses")
        .build();

    /// A value was released into the store.
    pub(crate) static RELEASES: Event = Event::builder()
        .name("recycling_pool_releases")
        .build();

    /// A reclamation cycle ran.
    ///
    /// The magnitude is the number of idle values dropped by the cycle.
    pub(crate) static RECLAIMED_VALUES: Event = Event::builder()
        .name("recycling_pool_reclaimed_values")
        .build();

    /// An acquire returned the zero value because the store produced nothing usable.
    pub(crate) static ZERO_FALLBACKS: Event = Event::builder()
        .name("recycling_pool_zero_fallbacks")
        .build();
}
