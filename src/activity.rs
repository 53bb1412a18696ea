//! Activity gating: the external activity-source contract and the
//! reentrancy-safe aggregate of active subscriptions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::subscription::SubscriptionId;

/// External condition gating whether a subscription receives deliveries
/// (visibility, foreground state, ...). The core never interprets what
/// "active" means: it reads `is_active` once at registration, and the
/// source drives every later transition by calling
/// [`notify_became_active`](crate::LiveCell::notify_became_active) /
/// [`notify_became_inactive`](crate::LiveCell::notify_became_inactive)
/// on the owning thread. Permanent teardown is signaled by calling
/// [`unregister_id`](crate::LiveCell::unregister_id).
pub trait ActivitySource: Send + Sync {
    /// Current state of the external condition.
    fn is_active(&self) -> bool;

    /// Called when the bound subscription is unregistered, so the
    /// source can drop its side of the wiring.
    fn detached(&self, id: SubscriptionId) { let _ = id; }
}

/// Holder-level hooks fired on real zero-crossings of the active
/// subscription count: `on_became_used` when it leaves zero,
/// `on_became_unused` when it returns to zero.
#[derive(Default, Clone)]
pub struct UsageHooks {
    pub(crate) on_became_used: Option<Arc<dyn Fn() + Send + Sync>>,
    pub(crate) on_became_unused: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl UsageHooks {
    pub fn new() -> Self { Self::default() }

    pub fn on_became_used(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_became_used = Some(Arc::new(hook));
        self
    }

    pub fn on_became_unused(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_became_unused = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for UsageHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageHooks")
            .field("on_became_used", &self.on_became_used.is_some())
            .field("on_became_unused", &self.on_became_unused.is_some())
            .finish()
    }
}

/// Running count of active subscriptions plus an in-progress guard.
/// Mutated only on the owning thread; atomics keep the holder `Sync`,
/// they do not arbitrate between threads.
pub(crate) struct ActivationCounter {
    count: AtomicI64,
    changing: AtomicBool,
}

impl ActivationCounter {
    pub fn new() -> Self { Self { count: AtomicI64::new(0), changing: AtomicBool::new(false) } }

    pub fn active(&self) -> i64 { self.count.load(Ordering::Relaxed) }

    /// Apply a ±1 activity delta and fire zero-crossing hooks.
    ///
    /// Hooks may synchronously register, unregister, or toggle
    /// subscriptions, which re-enters `apply`. The nested call updates
    /// the count and bails; the outer guarded loop re-reads until the
    /// count settles, so each real crossing fires exactly once and none
    /// are dropped. No recursion, no lock held while a hook runs.
    pub fn apply(&self, delta: i64, hooks: &UsageHooks) {
        let mut previous = self.count.load(Ordering::Relaxed);
        self.count.store(previous + delta, Ordering::Relaxed);
        if self.changing.swap(true, Ordering::Relaxed) {
            return;
        }
        loop {
            let current = self.count.load(Ordering::Relaxed);
            if previous == current {
                break;
            }
            let became_used = previous == 0 && current > 0;
            let became_unused = previous > 0 && current == 0;
            previous = current;
            if became_used {
                if let Some(hook) = &hooks.on_became_used {
                    hook();
                }
            } else if became_unused {
                if let Some(hook) = &hooks.on_became_unused {
                    hook();
                }
            }
        }
        self.changing.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_hooks() -> (UsageHooks, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = UsageHooks::new()
            .on_became_used({
                let log = log.clone();
                move || log.lock().unwrap().push("used")
            })
            .on_became_unused({
                let log = log.clone();
                move || log.lock().unwrap().push("unused")
            });
        (hooks, log)
    }

    #[test]
    fn crossings_fire_once() {
        let counter = ActivationCounter::new();
        let (hooks, log) = recording_hooks();

        counter.apply(1, &hooks); // 0 -> 1
        counter.apply(1, &hooks); // 1 -> 2, no crossing
        counter.apply(-1, &hooks); // 2 -> 1, no crossing
        counter.apply(-1, &hooks); // 1 -> 0
        assert_eq!(*log.lock().unwrap(), ["used", "unused"]);
        assert_eq!(counter.active(), 0);
    }

    #[test]
    fn reentrant_hook_does_not_double_fire() {
        let counter = Arc::new(ActivationCounter::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        // The "used" hook activates one more subscription, re-entering
        // apply. Only the outer loop may fire hooks.
        let hooks = Arc::new(Mutex::new(UsageHooks::new()));
        let hook_set = {
            let counter = counter.clone();
            let log = log.clone();
            let hooks = hooks.clone();
            UsageHooks::new().on_became_used(move || {
                log.lock().unwrap().push("used");
                let snapshot = hooks.lock().unwrap().clone();
                counter.apply(1, &snapshot);
            })
        };
        *hooks.lock().unwrap() = hook_set.clone();

        counter.apply(1, &hook_set);
        assert_eq!(counter.active(), 2);
        // One real 0 -> positive crossing, one hook invocation
        assert_eq!(*log.lock().unwrap(), ["used"]);
    }

    #[test]
    fn hook_that_drains_count_fires_unused() {
        let counter = Arc::new(ActivationCounter::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        // "used" immediately deactivates, driving the count back to
        // zero inside the hook: the outer loop must observe the
        // positive -> 0 crossing too.
        let unused_log = log.clone();
        let used_hooks = {
            let counter = counter.clone();
            let log = log.clone();
            UsageHooks::new()
                .on_became_used(move || {
                    log.lock().unwrap().push("used");
                    counter.apply(-1, &UsageHooks::new());
                })
                .on_became_unused(move || unused_log.lock().unwrap().push("unused"))
        };

        counter.apply(1, &used_hooks);
        assert_eq!(counter.active(), 0);
        assert_eq!(*log.lock().unwrap(), ["used", "unused"]);
    }
}
