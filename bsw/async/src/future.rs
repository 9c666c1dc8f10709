//! Cross-context wait/notify
//!
//! A [`FutureSupport`] is bound to the task context that will wait on it.
//! Any other task or an interrupt completes it with [`FutureSupport::notify`].
//! The underlying signal is a single bit: notifications that arrive before
//! the wait are kept, several notifications collapse into one.

use core::convert::Infallible;

use bsw_core::{ContextId, TASK_IDLE};

use crate::adapter::AsyncAdapter;
use crate::rtos::{BinarySignal, Rtos};
use crate::scheduler::Scheduler;

pub struct FutureSupport<'a, R: Rtos, const TASKS: usize> {
    adapter: &'a AsyncAdapter<R, TASKS>,
    context: ContextId,
    signal: R::Signal,
}

impl<'a, R: Rtos, const TASKS: usize> FutureSupport<'a, R, TASKS> {
    /// Bind a future to the task `context`
    pub fn new(adapter: &'a AsyncAdapter<R, TASKS>, context: ContextId) -> Self {
        Self {
            adapter,
            context,
            signal: adapter.rtos().create_signal(),
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Block until [`notify`](Self::notify) has been called.
    ///
    /// In the idle task the signal is polled and pending idle work is run
    /// between polls. Any other task blocks for a bounded number of ticks per
    /// attempt and retries. There is no overall timeout.
    pub fn wait(&self) {
        assert!(!self.adapter.is_in_isr(), "FutureSupport::wait called from an ISR");
        if self.adapter.current_context().is_idle() {
            while !self.signal.wait(0) {
                // idle context 0 always exists
                let _ = self.adapter.dispatch_while_work(TASK_IDLE);
            }
        } else {
            let ticks = self.adapter.config().future_wait_ticks.max(1);
            while !self.signal.wait(ticks) {}
        }
    }

    /// Consume a pending notification without blocking
    pub fn try_wait(&self) -> nb::Result<(), Infallible> {
        if self.signal.wait(0) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Release the waiter. Callable from any task or interrupt.
    pub fn notify(&self) {
        if self.adapter.is_in_isr() {
            if self.signal.set_from_isr() {
                self.adapter.request_yield_on_isr_exit();
            }
        } else {
            self.signal.set();
        }
    }

    /// Abort unless running in the bound context
    pub fn assert_task_context(&self) {
        self.adapter.assert_context(self.context);
    }

    /// True if running in the bound context
    pub fn verify_task_context(&self) -> bool {
        self.adapter.verify_context(self.context)
    }
}
