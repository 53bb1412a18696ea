use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::activity::ActivitySource;
use crate::cell::START_VERSION;
use crate::error::ProgrammingError;
use crate::listener::ChangeListener;

/// Caller-chosen identifier for a subscription, unique per holder.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl From<u64> for SubscriptionId {
    fn from(id: u64) -> Self { Self(id) }
}
impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// Per-subscription delivery behavior.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryOptions {
    /// Deliver the current value as soon as the subscription becomes
    /// active (including at registration time, if it starts active).
    /// When false, the subscription only hears about writes that happen
    /// while it is active.
    pub deliver_on_subscribe: bool,
}

impl Default for DeliveryOptions {
    fn default() -> Self { Self { deliver_on_subscribe: true } }
}

/// Proof of registration, returned by `register`. Deliberately not
/// `Clone`: consuming it in `unregister` retires the subscription for
/// good.
#[derive(Debug)]
pub struct SubscriptionHandle {
    pub(crate) id: SubscriptionId,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId { self.id }
}

pub(crate) struct Record<T> {
    pub listener: ChangeListener<T>,
    pub last_version: i64,
    pub active: bool,
    pub options: DeliveryOptions,
    pub binding: Option<Arc<dyn ActivitySource>>,
}

impl<T> Record<T> {
    pub fn new(listener: ChangeListener<T>, active: bool, options: DeliveryOptions, binding: Option<Arc<dyn ActivitySource>>) -> Self {
        Self { listener, last_version: START_VERSION, active, options, binding }
    }
}

/// Outcome of recomputing a subscription's activity.
pub(crate) enum ActivityChange {
    Unchanged,
    Changed { options: DeliveryOptions },
}

/// Insertion-ordered subscription store. All mutation happens on the
/// owning thread; the lock exists so the holder handle stays `Sync` and
/// so cross-thread readers (`get`, introspection) are safe. It is never
/// held across a listener or hook invocation.
pub(crate) struct Registry<T> {
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    records: HashMap<SubscriptionId, Record<T>>,
    // Dispatch order. Ids are pushed at registration and removed at
    // unregistration; dispatch iterates a clone of this so additions
    // mid-pass cannot corrupt the walk.
    order: Vec<SubscriptionId>,
}

impl<T> Registry<T> {
    pub fn new() -> Self { Self { inner: RwLock::new(Inner { records: HashMap::new(), order: Vec::new() }) } }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner<T>> { self.inner.read().expect("registry lock is poisoned") }
    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner<T>> { self.inner.write().expect("registry lock is poisoned") }

    pub fn insert(&self, id: SubscriptionId, record: Record<T>) -> Result<(), ProgrammingError> {
        let mut inner = self.write();
        if inner.records.contains_key(&id) {
            return Err(ProgrammingError::DuplicateSubscription(id));
        }
        inner.records.insert(id, record);
        inner.order.push(id);
        Ok(())
    }

    pub fn remove(&self, id: SubscriptionId) -> Result<Record<T>, ProgrammingError> {
        let mut inner = self.write();
        let record = inner.records.remove(&id).ok_or(ProgrammingError::UnknownSubscription(id))?;
        inner.order.retain(|other| *other != id);
        Ok(record)
    }

    /// Recompute a subscription's `active` flag. The counter delta and
    /// any follow-up targeted dispatch are the caller's job; this only
    /// reports whether a real transition happened.
    pub fn set_active(&self, id: SubscriptionId, active: bool) -> Result<ActivityChange, ProgrammingError> {
        let mut inner = self.write();
        let record = inner.records.get_mut(&id).ok_or(ProgrammingError::UnknownSubscription(id))?;
        if record.active == active {
            return Ok(ActivityChange::Unchanged);
        }
        record.active = active;
        Ok(ActivityChange::Changed { options: record.options })
    }

    /// Decide delivery for one subscription against the cell version:
    /// deliverable iff registered, active, and stale. On a claim the
    /// record's `last_version` is advanced *before* the listener runs,
    /// so a reentrant `set` from inside the callback reads as yet
    /// another newer generation.
    pub fn claim_delivery(&self, id: SubscriptionId, version: i64) -> Option<ChangeListener<T>> {
        let mut inner = self.write();
        let record = inner.records.get_mut(&id)?;
        if !record.active || record.last_version >= version {
            return None;
        }
        record.last_version = version;
        Some(record.listener.clone())
    }

    /// Forget every delivery. Used by `unset` so a value set afterwards
    /// reads as fresh to all subscriptions.
    pub fn reset_versions(&self) {
        let mut inner = self.write();
        for record in inner.records.values_mut() {
            record.last_version = START_VERSION;
        }
    }

    pub fn snapshot_order(&self) -> Vec<SubscriptionId> { self.read().order.clone() }

    pub fn len(&self) -> usize { self.read().records.len() }
}
