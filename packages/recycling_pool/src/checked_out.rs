use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use crate::{ReclaimingStore, RecyclingPool, Store};

/// A value taken from a [`RecyclingPool`] via [`checkout()`][RecyclingPool::checkout] that is
/// released back into the pool when the guard is dropped.
///
/// The guard dereferences to the value. Use [`into_inner()`][Self::into_inner] to keep the
/// value instead of releasing it.
///
/// As with manual release, the value is returned to the pool exactly as the holder left it.
///
/// # Example
///
/// ```
/// use recycling_pool::{CheckedOut, RecyclingPool};
///
/// let pool = RecyclingPool::new(String::new);
///
/// let mut greeting = pool.checkout();
/// greeting.push_str("hello");
///
/// // Detach the value from the pool, it will not be released.
/// let greeting: String = CheckedOut::into_inner(greeting);
/// assert_eq!(greeting, "hello");
/// assert!(pool.store().is_empty());
/// ```
pub struct CheckedOut<'a, T, S = ReclaimingStore>
where
    T: Send + 'static,
    S: Store,
{
    // Always initialized, only taken out in `drop()` or `into_inner()`.
    value: ManuallyDrop<T>,
    pool: &'a RecyclingPool<T, S>,
}

impl<'a, T, S> CheckedOut<'a, T, S>
where
    T: Send + 'static,
    S: Store,
{
    pub(crate) fn new(value: T, pool: &'a RecyclingPool<T, S>) -> Self {
        Self {
            value: ManuallyDrop::new(value),
            pool,
        }
    }

    /// Detaches the value from the pool without releasing it.
    ///
    /// This is an associated function rather than a method to avoid conflicts with methods
    /// of the dereferenced value.
    #[must_use]
    pub fn into_inner(this: Self) -> T {
        let mut this = ManuallyDrop::new(this);

        // SAFETY: `this` is never dropped, so the value is taken exactly once and the
        // guard's `Drop` never observes the emptied slot.
        unsafe { ManuallyDrop::take(&mut this.value) }
    }
}

impl<T, S> Deref for CheckedOut<'_, T, S>
where
    T: Send + 'static,
    S: Store,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T, S> DerefMut for CheckedOut<'_, T, S>
where
    T: Send + 'static,
    S: Store,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T, S> Drop for CheckedOut<'_, T, S>
where
    T: Send + 'static,
    S: Store,
{
    fn drop(&mut self) {
        // SAFETY: This is the only place besides `into_inner()` that takes the value, and
        // `into_inner()` prevents this from running.
        let value = unsafe { ManuallyDrop::take(&mut self.value) };

        self.pool.release(value);
    }
}

impl<T, S> fmt::Debug for CheckedOut<'_, T, S>
where
    T: fmt::Debug + Send + 'static,
    S: Store,
{
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CheckedOut").field(&*self.value).finish()
    }
}
