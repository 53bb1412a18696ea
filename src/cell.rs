use std::sync::{Arc, RwLock, Weak};
use std::thread::{self, ThreadId};

use tracing::{debug, trace};

use crate::activity::{ActivationCounter, ActivitySource, UsageHooks};
use crate::dispatch::DispatchGuard;
use crate::error::ProgrammingError;
use crate::listener::IntoChangeListener;
use crate::pending::PendingSlot;
use crate::scheduler::Scheduler;
use crate::subscription::{ActivityChange, DeliveryOptions, Record, Registry, SubscriptionHandle, SubscriptionId};

/// Version of a holder that has never held a value (or has been unset).
pub const START_VERSION: i64 = -1;

struct CellState<T> {
    value: Option<T>,
    version: i64,
}

struct Shared<T> {
    owner: ThreadId,
    state: RwLock<CellState<T>>,
    pending: PendingSlot<T>,
    registry: Registry<T>,
    counter: ActivationCounter,
    hooks: RwLock<UsageHooks>,
    dispatch: DispatchGuard,
    scheduler: Arc<dyn Scheduler>,
}

/// Lifecycle-gated, versioned observable value holder.
///
/// A single mutable slot broadcasting changes to independently
/// activatable subscriptions. Every accepted write bumps a monotonic
/// version; a subscription is delivered to iff a value is held, the
/// subscription is active, and its last delivered version is older than
/// the cell's. All mutation and dispatch happen on the thread that
/// created the holder; the only cross-thread entry points are
/// [`post`](Self::post) and [`get`](Self::get).
///
/// Cloning the handle is cheap and shares the holder.
pub struct LiveCell<T>(Arc<Shared<T>>);

impl<T> Clone for LiveCell<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for LiveCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.state.read().expect("cell state lock is poisoned");
        f.debug_struct("LiveCell")
            .field("version", &state.version)
            .field("has_value", &state.value.is_some())
            .field("subscriptions", &self.0.registry.len())
            .field("active", &self.0.counter.active())
            .finish()
    }
}

impl<T> LiveCell<T>
where T: Clone + Send + Sync + 'static
{
    /// Creates an empty holder owned by the calling thread.
    pub fn new(scheduler: impl Scheduler + 'static) -> Self { Self::build(None, START_VERSION, scheduler) }

    /// Creates a holder seeded with `value` at version 0.
    pub fn with_initial(value: T, scheduler: impl Scheduler + 'static) -> Self { Self::build(Some(value), 0, scheduler) }

    fn build(value: Option<T>, version: i64, scheduler: impl Scheduler + 'static) -> Self {
        Self(Arc::new(Shared {
            owner: thread::current().id(),
            state: RwLock::new(CellState { value, version }),
            pending: PendingSlot::new(),
            registry: Registry::new(),
            counter: ActivationCounter::new(),
            hooks: RwLock::new(UsageHooks::default()),
            dispatch: DispatchGuard::new(),
            scheduler: Arc::new(scheduler),
        }))
    }

    /// Stores `value`, bumps the version, and broadcasts to all
    /// subscriptions. Owning thread only.
    pub fn set(&self, value: T) -> Result<(), ProgrammingError> {
        self.ensure_owner("set")?;
        let version = {
            let mut state = self.state_mut();
            state.value = Some(value);
            state.version += 1;
            state.version
        };
        trace!(version, "value set, broadcasting");
        self.dispatch(None);
        Ok(())
    }

    /// Coalescing cross-thread write. Swaps `value` into the pending
    /// slot and, iff the slot was empty, schedules one apply task on
    /// the owning thread. A burst of posts before the apply runs
    /// results in exactly one `set` carrying the last value.
    pub fn post(&self, value: T) {
        if self.0.pending.replace(value).is_some() {
            trace!("post coalesced into pending write");
            return;
        }
        trace!("post scheduled apply task");
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.0);
        self.0.scheduler.run_on_owning_thread(Box::new(move || {
            let Some(shared) = weak.upgrade() else { return };
            let Some(value) = shared.pending.take() else { return };
            // A scheduler that runs this anywhere else has broken its
            // contract; there is no caller to propagate to here.
            LiveCell(shared).set(value).expect("pending write must be applied on the owning thread");
        }));
    }

    /// Clone of the current value, readable from any thread. Freshness
    /// is only guaranteed on the owning thread.
    pub fn get(&self) -> Option<T> { self.state().value.clone() }

    /// Current version: `START_VERSION` when unset, bumped by one per
    /// accepted write.
    pub fn version(&self) -> i64 { self.state().version }

    /// Clears the value and rewinds the version and every
    /// subscription's delivery record, without dispatching. A value set
    /// afterwards reads as fresh to everyone; the cleared value is
    /// never delivered to subscriptions registered after this call.
    pub fn unset(&self) -> Result<(), ProgrammingError> {
        self.ensure_owner("unset")?;
        {
            let mut state = self.state_mut();
            state.value = None;
            state.version = START_VERSION;
        }
        self.0.registry.reset_versions();
        debug!("holder unset");
        Ok(())
    }

    /// Registers a forever-active subscription: it has no activity
    /// source, counts as active until explicitly unregistered, and (per
    /// `options`) may immediately receive the current value.
    pub fn register<L>(&self, id: impl Into<SubscriptionId>, listener: L, options: DeliveryOptions) -> Result<SubscriptionHandle, ProgrammingError>
    where L: IntoChangeListener<T> {
        self.register_inner(id.into(), listener.into_change_listener(), options, None)
    }

    /// Registers a subscription gated by an activity source. Initial
    /// activity is read from `source.is_active()`; later transitions
    /// are driven by the source through
    /// [`notify_became_active`](Self::notify_became_active) /
    /// [`notify_became_inactive`](Self::notify_became_inactive).
    pub fn register_bound<L>(
        &self,
        id: impl Into<SubscriptionId>,
        listener: L,
        options: DeliveryOptions,
        source: Arc<dyn ActivitySource>,
    ) -> Result<SubscriptionHandle, ProgrammingError>
    where
        L: IntoChangeListener<T>,
    {
        self.register_inner(id.into(), listener.into_change_listener(), options, Some(source))
    }

    fn register_inner(
        &self,
        id: SubscriptionId,
        listener: crate::listener::ChangeListener<T>,
        options: DeliveryOptions,
        binding: Option<Arc<dyn ActivitySource>>,
    ) -> Result<SubscriptionHandle, ProgrammingError> {
        self.ensure_owner("register")?;
        let active = binding.as_ref().map(|source| source.is_active()).unwrap_or(true);
        self.0.registry.insert(id, Record::new(listener, active, options, binding))?;
        debug!(%id, active, "subscription registered");
        if active {
            self.change_active_counter(1);
            if options.deliver_on_subscribe {
                self.dispatch(Some(id));
            }
        }
        Ok(SubscriptionHandle { id })
    }

    /// Retires a subscription, consuming its handle.
    pub fn unregister(&self, handle: SubscriptionHandle) -> Result<(), ProgrammingError> { self.unregister_id(handle.id) }

    /// Retires a subscription by id. Used by activity sources to signal
    /// permanent teardown.
    pub fn unregister_id(&self, id: impl Into<SubscriptionId>) -> Result<(), ProgrammingError> {
        self.ensure_owner("unregister")?;
        let id = id.into();
        let record = self.0.registry.remove(id)?;
        debug!(%id, was_active = record.active, "subscription unregistered");
        if let Some(binding) = &record.binding {
            binding.detached(id);
        }
        if record.active {
            self.change_active_counter(-1);
        }
        Ok(())
    }

    /// Activity-source entry point: the external condition for `id`
    /// crossed into the active state. Idempotent for an already-active
    /// subscription. On a real transition the subscription (per its
    /// options) receives the current value via a targeted dispatch.
    pub fn notify_became_active(&self, id: impl Into<SubscriptionId>) -> Result<(), ProgrammingError> {
        self.ensure_owner("notify_became_active")?;
        let id = id.into();
        if let ActivityChange::Changed { options } = self.0.registry.set_active(id, true)? {
            trace!(%id, "subscription became active");
            self.change_active_counter(1);
            if options.deliver_on_subscribe {
                self.dispatch(Some(id));
            }
        }
        Ok(())
    }

    /// Activity-source entry point: the external condition for `id`
    /// crossed out of the active state. Idempotent for an
    /// already-inactive subscription. Does not touch the subscription's
    /// delivery record: on reactivation it catches up to the newest
    /// version in a single delivery.
    pub fn notify_became_inactive(&self, id: impl Into<SubscriptionId>) -> Result<(), ProgrammingError> {
        self.ensure_owner("notify_became_inactive")?;
        let id = id.into();
        if let ActivityChange::Changed { .. } = self.0.registry.set_active(id, false)? {
            trace!(%id, "subscription became inactive");
            self.change_active_counter(-1);
        }
        Ok(())
    }

    /// Installs the holder-level zero-crossing hooks. Owning thread
    /// only; replaces any previously installed hooks.
    pub fn set_usage_hooks(&self, hooks: UsageHooks) -> Result<(), ProgrammingError> {
        self.ensure_owner("set_usage_hooks")?;
        *self.0.hooks.write().expect("hooks lock is poisoned") = hooks;
        Ok(())
    }

    pub fn has_active_subscriptions(&self) -> bool { self.0.counter.active() > 0 }

    pub fn subscription_count(&self) -> usize { self.0.registry.len() }

    fn change_active_counter(&self, delta: i64) {
        // Snapshot the hooks so none of our locks are held while they
        // run; hooks may re-enter registration and activity paths.
        let hooks = self.0.hooks.read().expect("hooks lock is poisoned").clone();
        self.0.counter.apply(delta, &hooks);
    }

    /// The delivery loop. `initiator` is `Some` for a targeted dispatch
    /// right after a subscription became active, `None` for a full
    /// broadcast. A dispatch arriving while one is running marks it
    /// invalidated and returns; the running loop then owes full passes
    /// until one completes uninvalidated, so reentrant writes from
    /// inside listeners neither recurse nor lose updates.
    fn dispatch(&self, initiator: Option<SubscriptionId>) {
        if !self.0.dispatch.begin() {
            trace!("dispatch already running, invalidated");
            return;
        }
        let mut initiator = initiator;
        loop {
            match initiator.take() {
                Some(id) => self.attempt_deliver(id),
                None => {
                    for id in self.0.registry.snapshot_order() {
                        self.attempt_deliver(id);
                    }
                }
            }
            if !self.0.dispatch.consume_invalidated() {
                break;
            }
            trace!("dispatch invalidated mid-pass, running another pass");
        }
        self.0.dispatch.finish();
    }

    /// Delivers to one subscription iff a value is held, the
    /// subscription is active, and it has not yet seen the current
    /// version. The listener runs with no locks held.
    fn attempt_deliver(&self, id: SubscriptionId) {
        let version = self.state().version;
        if version == START_VERSION {
            return;
        }
        let Some(listener) = self.0.registry.claim_delivery(id, version) else { return };
        // Only the owning thread writes the cell, and that's us: the
        // value read here is the one `claim_delivery` saw.
        let Some(value) = self.state().value.clone() else { return };
        trace!(%id, version, "delivering");
        listener.invoke(value);
    }

    fn ensure_owner(&self, op: &'static str) -> Result<(), ProgrammingError> {
        let caller = thread::current().id();
        if caller == self.0.owner {
            Ok(())
        } else {
            Err(ProgrammingError::WrongThread { op, owner: self.0.owner, caller })
        }
    }

    fn state(&self) -> std::sync::RwLockReadGuard<'_, CellState<T>> { self.0.state.read().expect("cell state lock is poisoned") }
    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, CellState<T>> { self.0.state.write().expect("cell state lock is poisoned") }
}
