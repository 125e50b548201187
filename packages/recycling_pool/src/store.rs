use std::any::Any;
use std::fmt::Debug;

/// A type-erased value held by a [`Store`] while it is not checked out.
pub type ErasedValue = Box<dyn Any + Send>;

/// The untyped backing store that a [`RecyclingPool`][crate::RecyclingPool] delegates to.
///
/// The store decides which idle values to retain and when to discard them. It also owns the
/// fallback hook that produces a new value when it has nothing to hand out.
///
/// # Contract
///
/// * Two concurrent calls to [`acquire()`][Self::acquire] never receive the same stored value.
/// * [`release()`][Self::release] may be called concurrently with any number of other calls.
/// * The fallback hook may be invoked concurrently when several callers miss at the same time.
///
/// [`ReclaimingStore`][crate::ReclaimingStore] is the default implementation.
#[cfg_attr(test, mockall::automock)]
pub trait Store: Debug + Send + Sync + 'static {
    /// Takes an idle value out of the store.
    ///
    /// On a miss, the store invokes its fallback hook (if it has one) and returns whatever the
    /// hook produced. `None` means the store had nothing to offer.
    fn acquire(&self) -> Option<ErasedValue>;

    /// Hands a value to the store, making it eligible to be returned by a later `acquire()`.
    ///
    /// The store is free to drop the value at any point afterwards.
    fn release(&self, value: ErasedValue);
}
