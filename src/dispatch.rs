//! Reentrancy guard for the delivery loop.

use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const DISPATCHING: u8 = 1;
const DISPATCHING_INVALIDATED: u8 = 2;

/// Three-state machine guarding dispatch: `Idle`, `Dispatching`,
/// `DispatchingInvalidated`. A dispatch arriving while one is already
/// running never recurses; it marks the running one invalidated and
/// returns, and the outer loop runs additional full passes until a pass
/// completes without being invalidated.
///
/// Only the owning thread touches this; the atomic exists so the shared
/// holder state is `Sync`, not for cross-thread ordering.
pub(crate) struct DispatchGuard(AtomicU8);

impl DispatchGuard {
    pub fn new() -> Self { Self(AtomicU8::new(IDLE)) }

    /// Try to become the dispatching call. Returns false if a dispatch
    /// is already running, in which case that run is marked
    /// invalidated.
    pub fn begin(&self) -> bool {
        match self.0.compare_exchange(IDLE, DISPATCHING, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => true,
            Err(_) => {
                self.0.store(DISPATCHING_INVALIDATED, Ordering::Relaxed);
                false
            }
        }
    }

    /// After a full pass: consume an invalidation mark, reporting
    /// whether another pass is owed.
    pub fn consume_invalidated(&self) -> bool {
        self.0.compare_exchange(DISPATCHING_INVALIDATED, DISPATCHING, Ordering::Relaxed, Ordering::Relaxed).is_ok()
    }

    pub fn finish(&self) { self.0.store(IDLE, Ordering::Relaxed); }
}
