use std::sync::Mutex;

/// Single-slot buffer coalescing cross-thread writes into one pending
/// value. The slot itself carries the pending/not-pending state (`Some`
/// vs `None`); callers schedule at most one apply task per transition
/// out of `None`, so there is never more than one outstanding apply.
///
/// The mutex guards only the swap. Nothing else ever runs under it.
pub(crate) struct PendingSlot<T>(Mutex<Option<T>>);

impl<T> PendingSlot<T> {
    pub fn new() -> Self { Self(Mutex::new(None)) }

    /// Swap `value` in, returning what was there before. A `None` return
    /// means this write transitioned the slot from empty to pending and
    /// the caller owns scheduling the apply task.
    pub fn replace(&self, value: T) -> Option<T> { self.0.lock().expect("pending slot lock is poisoned").replace(value) }

    /// Swap the slot back to empty, returning the pending value if any.
    pub fn take(&self) -> Option<T> { self.0.lock().expect("pending slot lock is poisoned").take() }
}
