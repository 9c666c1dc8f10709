//! Time-ordered list of armed timeouts for one context

use bsw_core::{is_due, time_diff, ContextId, Linked, Queue, Runnable};
use critical_section::CriticalSection;

use crate::timeout::{Timeout, TimeoutMode, TimeoutState};

/// Armed timeouts of a task context, ordered by due time.
///
/// Timeouts with equal due time fire in the order they were armed.
pub struct Timer {
    timeouts: Queue<Timeout>,
}

impl Timer {
    pub const fn new() -> Self {
        Self {
            timeouts: Queue::new(),
        }
    }

    /// True if `timeout` sits in any timer list
    pub fn is_active(&self, timeout: &Timeout) -> bool {
        critical_section::with(|cs| timeout.link().is_enqueued(cs))
    }

    /// Arm `timeout` to run `runnable` once, `delay_us` after `now`.
    ///
    /// Returns `None` if the timeout is already armed, otherwise whether it
    /// became the earliest timeout of this list.
    pub fn set(
        &self,
        timeout: &'static Timeout,
        runnable: &'static dyn Runnable,
        context: ContextId,
        delay_us: u32,
        now: u32,
    ) -> Option<bool> {
        self.arm(timeout, runnable, context, TimeoutMode::OneShot, delay_us, now)
    }

    /// Arm `timeout` to run `runnable` every `period_us`, first at
    /// `now + period_us`.
    pub fn set_cyclic(
        &self,
        timeout: &'static Timeout,
        runnable: &'static dyn Runnable,
        context: ContextId,
        period_us: u32,
        now: u32,
    ) -> Option<bool> {
        assert!(period_us > 0, "fixed-rate period must not be zero");
        self.arm(timeout, runnable, context, TimeoutMode::FixedRate, period_us, now)
    }

    fn arm(
        &self,
        timeout: &'static Timeout,
        runnable: &'static dyn Runnable,
        context: ContextId,
        mode: TimeoutMode,
        delay_us: u32,
        now: u32,
    ) -> Option<bool> {
        critical_section::with(|cs| {
            if timeout.link().is_enqueued(cs) {
                return None;
            }
            timeout.update(cs, |slot| {
                slot.runnable = Some(runnable);
                slot.context = context;
                slot.mode = mode;
                slot.period_us = delay_us;
                slot.due_us = now.wrapping_add(delay_us);
                slot.state = TimeoutState::Scheduled;
            });
            Some(self.insert(cs, timeout, now))
        })
    }

    fn insert(&self, cs: CriticalSection<'_>, timeout: &'static Timeout, now: u32) -> bool {
        let distance = time_diff(timeout.slot(cs).due_us, now);
        let after = self
            .timeouts
            .iter(cs)
            .take_while(|queued| time_diff(queued.slot(cs).due_us, now) <= distance)
            .last();
        self.timeouts.insert_after(cs, after, timeout);
        after.is_none()
    }

    /// Disarm `timeout` if it is armed in this list.
    ///
    /// Returns whether it was removed.
    pub fn cancel(&self, timeout: &Timeout) -> bool {
        critical_section::with(|cs| {
            let removed = self.timeouts.remove(cs, timeout);
            if removed {
                timeout.update(cs, |slot| slot.state = TimeoutState::Canceled);
            }
            removed
        })
    }

    /// Microseconds until the earliest timeout is due, `Some(0)` if overdue
    pub fn next_delta(&self, now: u32) -> Option<u32> {
        critical_section::with(|cs| {
            self.timeouts
                .front(cs)
                .map(|head| time_diff(head.slot(cs).due_us, now).max(0) as u32)
        })
    }

    /// Fire the earliest timeout if it is due at `now`.
    ///
    /// A fixed-rate timeout is re-armed at its previous due time plus its
    /// period before its runnable runs, so a late dispatch does not shift the
    /// cadence. Returns whether a timeout fired.
    pub fn process_next(&self, now: u32) -> bool {
        let fired = critical_section::with(|cs| {
            let head = self.timeouts.front(cs)?;
            let slot = head.slot(cs);
            if !is_due(slot.due_us, now) {
                return None;
            }
            self.timeouts.dequeue(cs);
            match slot.mode {
                TimeoutMode::OneShot => {
                    head.update(cs, |s| s.state = TimeoutState::Expired);
                }
                TimeoutMode::FixedRate => {
                    head.update(cs, |s| s.due_us = slot.due_us.wrapping_add(slot.period_us));
                    self.insert(cs, head, now);
                }
            }
            slot.runnable
        });
        match fired {
            Some(runnable) => {
                log::trace!("timeout fired");
                runnable.execute();
                true
            }
            None => false,
        }
    }

    /// Number of armed timeouts
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.timeouts.len(cs))
    }

    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.timeouts.is_empty(cs))
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
