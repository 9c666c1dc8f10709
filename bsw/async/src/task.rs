//! Per-task dispatch state

use bsw_core::{ContextId, SystemClock};

use crate::executor::RunnableExecutor;
use crate::rtos::{EventMask, EVENT_EXECUTE};
use crate::timer::Timer;

/// Everything a task context needs to dispatch work: its executor queue for
/// immediate requests and its timer list for delayed ones.
pub struct TaskContext {
    id: ContextId,
    name: &'static str,
    executor: RunnableExecutor,
    timer: Timer,
}

impl TaskContext {
    pub const fn new(id: ContextId, name: &'static str) -> Self {
        Self {
            id,
            name,
            executor: RunnableExecutor::new(),
            timer: Timer::new(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn executor(&self) -> &RunnableExecutor {
        &self.executor
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// RTOS ticks to block for the next event.
    ///
    /// With a timeout armed this is the time until it is due, rounded up to
    /// whole ticks; otherwise `idle_ticks`. The flag tells whether a timeout
    /// bounds the wait.
    pub fn wait_ticks(&self, now: u32, tick_period_us: u32, idle_ticks: u32) -> (u32, bool) {
        match self.timer.next_delta(now) {
            Some(delta) => (delta.div_ceil(tick_period_us.max(1)), true),
            None => (idle_ticks, false),
        }
    }

    /// Fire every timeout that is due. Returns how many fired.
    pub fn handle_timeouts<C: SystemClock + ?Sized>(&self, clock: &C) -> usize {
        let mut fired = 0;
        while self.timer.process_next(clock.system_time_us()) {
            fired += 1;
        }
        fired
    }

    /// Process one batch of events: due timeouts first, then queued
    /// runnables.
    pub fn handle_events<C: SystemClock + ?Sized>(&self, events: EventMask, clock: &C) {
        self.handle_timeouts(clock);
        if events & EVENT_EXECUTE != 0 {
            self.executor.handle();
        }
    }
}

impl core::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pending_timeouts", &self.timer.len())
            .finish()
    }
}
