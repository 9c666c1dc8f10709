//! Queue of runnables waiting for immediate dispatch

use bsw_core::{Linked, Runnable, RunnableQueue};

/// Per-context FIFO of runnables posted with `execute`.
pub struct RunnableExecutor {
    queue: RunnableQueue,
}

impl RunnableExecutor {
    pub const fn new() -> Self {
        Self {
            queue: RunnableQueue::new(),
        }
    }

    /// Queue `runnable`. Returns `false` if it is already pending, in which
    /// case it will still run only once.
    pub fn enqueue(&self, runnable: &'static dyn Runnable) -> bool {
        critical_section::with(|cs| self.queue.enqueue(cs, runnable))
    }

    /// Run queued runnables in FIFO order until the queue is empty,
    /// including those posted while draining. Returns how many ran.
    pub fn handle(&self) -> usize {
        let mut executed = 0;
        while let Some(runnable) = critical_section::with(|cs| self.queue.dequeue(cs)) {
            runnable.execute();
            executed += 1;
        }
        executed
    }

    pub fn is_pending(&self, runnable: &'static dyn Runnable) -> bool {
        critical_section::with(|cs| runnable.link().is_enqueued(cs))
    }

    /// Drop every pending runnable without running it
    pub fn clear(&self) {
        critical_section::with(|cs| self.queue.clear(cs));
    }

    /// Take `runnable` back out of the queue
    pub fn remove(&self, runnable: &'static dyn Runnable) -> bool {
        critical_section::with(|cs| self.queue.remove(cs, runnable))
    }

    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.queue.is_empty(cs))
    }
}

impl Default for RunnableExecutor {
    fn default() -> Self {
        Self::new()
    }
}
