use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::metrics::ZERO_FALLBACKS;
use crate::{CheckedOut, ReclaimingStore, RecyclingPoolBuilder, Store};

/// A thread-safe pool of interchangeable values of type `T`.
///
/// Released values are kept by the backing [`Store`] and handed out again by later calls to
/// [`acquire()`][Self::acquire], saving the cost of creating new values. When the store has no
/// idle value, the factory given at construction time creates a fresh one.
///
/// The pool never resets, validates or cleans up released values. If a value carries state
/// that the next holder must not see, the releasing caller must clear it before releasing.
///
/// The store may drop idle values at any time according to its own policy (see
/// [`ReclaimingStore`] for the default behavior), so releasing a value is no guarantee that it
/// will ever be returned again.
///
/// # Zero value fallback
///
/// If the store produces nothing usable on an acquire (it has no fallback hook, its hook
/// produced nothing, or it returned a value of some other type), the pool returns
/// `T::default()` instead of failing. For pointer-like `T` such as `Option<Box<U>>` this is
/// `None`, which callers can check for. For value-like `T` the fallback cannot be told apart
/// from a freshly created value that happens to equal the default.
///
/// # Thread safety
///
/// The pool can be shared between threads (e.g. in a `static` or an `Arc`) and used
/// concurrently without external locking. All synchronization is delegated to the store.
///
/// # Example
///
/// ```
/// use recycling_pool::RecyclingPool;
///
/// let pool = RecyclingPool::new(|| Vec::<u8>::with_capacity(1024));
///
/// let mut buffer = pool.acquire();
/// buffer.extend_from_slice(b"hello");
///
/// // Clearing is our responsibility, the pool does not do it.
/// buffer.clear();
/// pool.release(buffer);
///
/// let buffer = pool.acquire();
/// assert!(buffer.is_empty());
/// assert!(buffer.capacity() >= 1024);
/// ```
pub struct RecyclingPool<T, S = ReclaimingStore> {
    store: S,

    _values: PhantomData<fn(T) -> T>,
}

impl<T> RecyclingPool<T>
where
    T: Send + 'static,
{
    /// Creates a pool with default configuration that uses `new_func` to create a value
    /// whenever the store has none idle.
    ///
    /// `new_func` is not called here. It may later be called concurrently from multiple
    /// threads when several callers find the store empty at the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::RecyclingPool;
    ///
    /// let pool = RecyclingPool::new(String::new);
    ///
    /// let text = pool.acquire();
    /// assert!(text.is_empty());
    /// ```
    pub fn new<F>(new_func: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder().build(new_func)
    }

    /// Returns a builder for creating a [`RecyclingPool`] with custom configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use recycling_pool::RecyclingPool;
    ///
    /// let pool = RecyclingPool::builder()
    ///     .shard_count(NonZero::new(1).unwrap())
    ///     .build(String::new);
    /// # drop(pool);
    /// ```
    pub fn builder() -> RecyclingPoolBuilder<T> {
        RecyclingPoolBuilder::new()
    }
}

impl<T, S> RecyclingPool<T, S>
where
    T: Send + 'static,
    S: Store,
{
    /// Creates a pool that delegates to an existing store.
    ///
    /// The store's fallback hook (if any) is responsible for creating new values. Values it
    /// creates must be of type `T` to be usable, anything else is replaced by the zero value.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::{ReclaimingStore, RecyclingPool};
    ///
    /// let store = ReclaimingStore::builder()
    ///     .fallback(|| Some(Box::new(7_u64)))
    ///     .build();
    ///
    /// let pool = RecyclingPool::<u64, _>::from_store(store);
    /// assert_eq!(pool.acquire(), 7);
    /// ```
    #[must_use]
    pub fn from_store(store: S) -> Self {
        Self {
            store,
            _values: PhantomData,
        }
    }

    /// Takes a value from the pool.
    ///
    /// Returns an idle value if the store has one, otherwise a value created by the factory.
    /// If neither is available, returns `T::default()` (see the type-level documentation).
    ///
    /// The value is exclusively owned by the caller until it is passed to
    /// [`release()`][Self::release], if ever.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::RecyclingPool;
    ///
    /// let pool = RecyclingPool::new(|| Some(Box::new([0_u8; 64])));
    ///
    /// let scratch = pool.acquire();
    /// assert!(scratch.is_some());
    /// ```
    #[must_use]
    pub fn acquire(&self) -> T
    where
        T: Default,
    {
        let Some(erased) = self.store.acquire() else {
            return zero_value();
        };

        match erased.downcast::<T>() {
            Ok(value) => *value,
            Err(_) => {
                debug!(
                    expected = type_name::<T>(),
                    "store returned a value of an unexpected type"
                );

                zero_value()
            }
        }
    }

    /// Returns a value to the pool so that a later acquire may reuse it.
    ///
    /// The value is stored as-is. Whether and when it is handed out again is up to the store.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::RecyclingPool;
    ///
    /// let pool = RecyclingPool::new(|| String::with_capacity(256));
    ///
    /// let mut text = pool.acquire();
    /// text.push_str("scratch");
    /// text.clear();
    ///
    /// pool.release(text);
    /// ```
    pub fn release(&self, value: T) {
        self.store.release(Box::new(value));
    }

    /// Takes a value from the pool wrapped in a guard that releases it back into the pool
    /// when dropped.
    ///
    /// Behaves like [`acquire()`][Self::acquire] in every other respect.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::RecyclingPool;
    ///
    /// let pool = RecyclingPool::new(Vec::<u32>::new);
    ///
    /// {
    ///     let mut numbers = pool.checkout();
    ///     numbers.push(42);
    /// } // Released here.
    ///
    /// assert_eq!(*pool.checkout(), vec![42]);
    /// ```
    #[must_use]
    pub fn checkout(&self) -> CheckedOut<'_, T, S>
    where
        T: Default,
    {
        CheckedOut::new(self.acquire(), self)
    }

    /// Returns the store that backs this pool.
    ///
    /// # Example
    ///
    /// ```
    /// use recycling_pool::RecyclingPool;
    ///
    /// let pool = RecyclingPool::new(String::new);
    /// pool.release(String::from("idle"));
    ///
    /// assert_eq!(pool.store().len(), 1);
    /// ```
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn zero_value<T: Default>() -> T {
    _ = ZERO_FALLBACKS.try_with(|e| e.observe_once());
    T::default()
}

impl<T> Default for RecyclingPool<T>
where
    T: Default + Send + 'static,
{
    /// Creates a pool that creates new values via `T::default()`.
    fn default() -> Self {
        Self::new(T::default)
    }
}

impl<T, S> fmt::Debug for RecyclingPool<T, S>
where
    S: fmt::Debug,
{
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::MockStore;

    assert_impl_all!(RecyclingPool<String>: Send, Sync);
    assert_impl_all!(RecyclingPool<Option<Box<[u8]>>>: Send, Sync);

    #[derive(Debug, Default, PartialEq, Eq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn absent_result_yields_default_value() {
        let mut store = MockStore::new();
        store.expect_acquire().once().returning(|| None);

        let pool = RecyclingPool::<Point, _>::from_store(store);

        assert_eq!(pool.acquire(), Point::default());
    }

    #[test]
    fn absent_result_yields_none_for_pointer_like_type() {
        let mut store = MockStore::new();
        store.expect_acquire().once().returning(|| None);

        let pool = RecyclingPool::<Option<Arc<Point>>, _>::from_store(store);

        assert!(pool.acquire().is_none());
    }

    #[test]
    fn foreign_type_from_store_yields_default_value() {
        let mut store = MockStore::new();
        store
            .expect_acquire()
            .once()
            .returning(|| Some(Box::new("not a point")));

        let pool = RecyclingPool::<Point, _>::from_store(store);

        assert_eq!(pool.acquire(), Point::default());
    }

    #[test]
    fn stored_value_is_narrowed_to_item_type() {
        let mut store = MockStore::new();
        store
            .expect_acquire()
            .once()
            .returning(|| Some(Box::new(Point { x: 1, y: 2 })));

        let pool = RecyclingPool::<Point, _>::from_store(store);

        assert_eq!(pool.acquire(), Point { x: 1, y: 2 });
    }

    #[test]
    fn release_hands_value_to_store_unchanged() {
        let mut store = MockStore::new();
        store
            .expect_release()
            .once()
            .withf(|value| value.downcast_ref::<Point>() == Some(&Point { x: 3, y: 4 }))
            .return_const(());

        let pool = RecyclingPool::<Point, _>::from_store(store);

        pool.release(Point { x: 3, y: 4 });
    }

    #[test]
    fn default_pool_creates_default_values() {
        let pool = RecyclingPool::<Point>::default();

        assert_eq!(pool.acquire(), Point::default());
    }

    #[test]
    fn store_accessor_exposes_backing_store() {
        let pool = RecyclingPool::new(String::new);

        pool.release(String::from("a"));
        pool.release(String::from("b"));

        assert_eq!(pool.store().len(), 2);
    }
}
