use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use livecell::{ActivitySource, OwningTask, Scheduler, SubscriptionId};

#[allow(unused)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Returns a listener closure that records every delivered value, and a
/// checker that drains what was recorded since the last check.
#[allow(unused)]
pub fn change_watcher<T: Send + Sync + 'static>() -> (Box<dyn Fn(T) + Send + Sync>, Box<dyn Fn() -> Vec<T> + Send + Sync>) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let changes = changes.clone();
        Box::new(move |value: T| {
            changes.lock().unwrap().push(value);
        })
    };

    let check = Box::new(move || {
        let changes: Vec<T> = changes.lock().unwrap().drain(..).collect();
        changes
    });

    (watcher, check)
}

/// Scheduler that queues apply tasks until the test drains them,
/// keeping the post/apply boundary deterministic.
#[derive(Clone, Default)]
pub struct ManualScheduler(Arc<Mutex<Vec<OwningTask>>>);

#[allow(unused)]
impl ManualScheduler {
    pub fn new() -> Self { Self::default() }

    pub fn pending(&self) -> usize { self.0.lock().unwrap().len() }

    /// Runs all queued tasks on the calling thread, returning how many ran.
    pub fn drain(&self) -> usize {
        let tasks: Vec<OwningTask> = self.0.lock().unwrap().drain(..).collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn run_on_owning_thread(&self, task: OwningTask) { self.0.lock().unwrap().push(task); }
}

/// Activity source test double: a flag the test flips by hand, plus a
/// record of teardown notifications.
pub struct TestSource {
    active: AtomicBool,
    detached: Mutex<Vec<SubscriptionId>>,
}

#[allow(unused)]
impl TestSource {
    pub fn new(active: bool) -> Arc<Self> { Arc::new(Self { active: AtomicBool::new(active), detached: Mutex::new(Vec::new()) }) }

    pub fn set_active(&self, active: bool) { self.active.store(active, Ordering::Relaxed); }

    pub fn detached_ids(&self) -> Vec<SubscriptionId> { self.detached.lock().unwrap().clone() }
}

impl ActivitySource for TestSource {
    fn is_active(&self) -> bool { self.active.load(Ordering::Relaxed) }

    fn detached(&self, id: SubscriptionId) { self.detached.lock().unwrap().push(id); }
}
