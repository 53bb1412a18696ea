use std::thread::ThreadId;
use thiserror::Error;

use crate::subscription::SubscriptionId;

/// Usage bugs, not runtime conditions. Every variant indicates a broken
/// caller contract and is propagated immediately rather than retried or
/// swallowed; what to do with one (crash, log-and-continue) is the host
/// application's call.
#[derive(Error, Debug)]
pub enum ProgrammingError {
    #[error("`{op}` called off the owning thread (owner {owner:?}, caller {caller:?})")]
    WrongThread { op: &'static str, owner: ThreadId, caller: ThreadId },

    #[error("subscription {0} is already registered")]
    DuplicateSubscription(SubscriptionId),

    #[error("subscription {0} is not registered")]
    UnknownSubscription(SubscriptionId),
}
