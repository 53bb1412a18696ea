/*!
A lifecycle-gated, versioned observable value holder.

A [`LiveCell`] is a single mutable slot broadcasting changes to many
independently activatable subscriptions. Every accepted write bumps a
monotonic version; each active subscription eventually sees the latest
value exactly once, including under reentrant writes from inside
callbacks and coalesced cross-thread writes via [`LiveCell::post`].

All mutation happens on the thread that created the holder. Activity is
driven externally through the [`ActivitySource`] contract; what "active"
means (visibility, foreground state, ...) is the source's business.

# Basic usage

```rust
use livecell::{DeliveryOptions, InlineScheduler, LiveCell};
use std::sync::{Arc, Mutex};

let cell = LiveCell::with_initial("ready".to_string(), InlineScheduler);

let seen = Arc::new(Mutex::new(Vec::new()));
let sub = cell
    .register(
        1,
        {
            let seen = seen.clone();
            move |value: String| seen.lock().unwrap().push(value)
        },
        DeliveryOptions::default(),
    )
    .unwrap();

// Registration delivered the current value; the write delivers the next.
cell.set("go".to_string()).unwrap();
assert_eq!(*seen.lock().unwrap(), ["ready", "go"]);

cell.unregister(sub).unwrap();
```

# Activity gating

```rust
use livecell::{ActivitySource, DeliveryOptions, InlineScheduler, LiveCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Visibility(AtomicBool);
impl ActivitySource for Visibility {
    fn is_active(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

let visible = Arc::new(Visibility(AtomicBool::new(false)));
let cell = LiveCell::new(InlineScheduler);
cell.register_bound(7, |value: i32| println!("saw {value}"), DeliveryOptions::default(), visible.clone()).unwrap();

cell.set(1).unwrap(); // inactive: nothing delivered

visible.0.store(true, Ordering::Relaxed);
cell.notify_became_active(7).unwrap(); // delivers the newest value once
```
*/

mod activity;
mod cell;
mod dispatch;
mod error;
mod listener;
mod pending;
mod scheduler;
mod subscription;

pub use activity::{ActivitySource, UsageHooks};
pub use cell::{LiveCell, START_VERSION};
pub use error::ProgrammingError;
pub use listener::{ChangeListener, IntoChangeListener};
pub use scheduler::{InlineScheduler, OwningTask, Scheduler};
pub use subscription::{DeliveryOptions, SubscriptionHandle, SubscriptionId};
