//! The task-scheduling collaborator that hands coalesced background
//! writes back to the owning thread.

/// A deferred unit of work that must run on the owning thread.
pub type OwningTask = Box<dyn FnOnce() + Send + 'static>;

/// Injected at holder construction. [`LiveCell::post`](crate::LiveCell::post)
/// calls this exactly once per coalesced write burst; the implementation
/// must eventually run the task on the holder's owning thread.
pub trait Scheduler: Send + Sync {
    fn run_on_owning_thread(&self, task: OwningTask);
}

impl<F> Scheduler for F
where F: Fn(OwningTask) + Send + Sync
{
    fn run_on_owning_thread(&self, task: OwningTask) { self(task) }
}

/// Runs tasks immediately on the calling thread. Only valid when `post`
/// is itself called from the owning thread (single-threaded hosts); a
/// background `post` through this scheduler applies the write on the
/// wrong thread and panics.
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn run_on_owning_thread(&self, task: OwningTask) { task() }
}

/// Queue the task into a channel whose receiver is drained by the
/// owning thread.
#[cfg(feature = "tokio")]
impl Scheduler for tokio::sync::mpsc::UnboundedSender<OwningTask> {
    fn run_on_owning_thread(&self, task: OwningTask) {
        let _ = self.send(task); // Holder outliving its scheduler loop drops the write
    }
}
