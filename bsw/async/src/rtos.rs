//! Interface to the underlying real-time operating system
//!
//! A target port implements [`Rtos`] once. Everything above it is generic over
//! the trait and gets monomorphized, so no dynamic dispatch is involved on the
//! hot paths.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use bsw_core::{AsyncError, AsyncResult, ContextId, SystemClock};
use critical_section::Mutex;

/// Bit set delivered to a task context
pub type EventMask = u32;

/// Runnables are waiting in the executor queue
pub const EVENT_EXECUTE: EventMask = 1 << 0;
/// A timeout may be due
pub const EVENT_TIMER: EventMask = 1 << 1;
/// Leave the dispatch loop
pub const EVENT_STOP: EventMask = 1 << 2;
/// Every event a task context waits for
pub const EVENT_ALL: EventMask = EVENT_EXECUTE | EVENT_TIMER | EVENT_STOP;

/// Deepest interrupt nesting that can be tracked
pub const MAX_ISR_NESTING: usize = 8;

/// One-bit signal usable from tasks and interrupts.
///
/// Setting an already set signal has no further effect.
pub trait BinarySignal: Sync {
    /// Set the bit from task context
    fn set(&self);

    /// Set the bit from interrupt context.
    ///
    /// Returns `true` if a task of higher priority than the interrupted one
    /// was released and a context switch should follow the interrupt.
    fn set_from_isr(&self) -> bool;

    /// Wait up to `ticks` RTOS ticks for the bit and clear it.
    ///
    /// `ticks == 0` polls. Returns whether the bit was observed.
    fn wait(&self, ticks: u32) -> bool;
}

/// Services consumed from the RTOS.
pub trait Rtos: SystemClock + Sync {
    type Signal: BinarySignal;

    /// Length of one RTOS tick in microseconds
    fn tick_period_us(&self) -> u32;

    /// Id of the running task
    fn current_task(&self) -> ContextId;

    /// Interrupt bookkeeping of the executing core
    fn isr_state(&self) -> &IsrState;

    /// Set `events` in the notification word of `task`
    fn notify(&self, task: ContextId, events: EventMask);

    /// Interrupt-safe variant of [`Rtos::notify`]. Returns whether a higher
    /// priority task was released.
    fn notify_from_isr(&self, task: ContextId, events: EventMask) -> bool;

    /// Block the calling task, which must be `task`, for up to `ticks` until
    /// some event bit is set. Returns and clears the pending bits; `0` means
    /// the wait timed out. `ticks == 0` polls.
    fn wait_events(&self, task: ContextId, ticks: u32) -> EventMask;

    /// Request a context switch on return from the current interrupt
    fn yield_from_isr(&self);

    fn create_signal(&self) -> Self::Signal;
}

/// Stack of active ISR groups plus the pending-yield flag.
///
/// A single-core target keeps one instance for the whole system.
pub struct IsrState {
    groups: Mutex<RefCell<heapless::Vec<ContextId, MAX_ISR_NESTING>>>,
    yield_requested: AtomicBool,
}

impl IsrState {
    pub const fn new() -> Self {
        Self {
            groups: Mutex::new(RefCell::new(heapless::Vec::new())),
            yield_requested: AtomicBool::new(false),
        }
    }

    /// Push `group` as the active ISR group
    pub fn enter(&self, group: ContextId, max_depth: usize) -> AsyncResult<()> {
        critical_section::with(|cs| {
            let mut groups = self.groups.borrow_ref_mut(cs);
            if groups.len() >= max_depth {
                return Err(AsyncError::IsrNestingOverflow);
            }
            groups.push(group).map_err(|_| AsyncError::IsrNestingOverflow)
        })
    }

    /// Pop `group`. Returns `Some(yield_requested)` when the outermost
    /// interrupt was left, `None` while still nested.
    pub fn leave(&self, group: ContextId) -> Option<bool> {
        let (left, outermost) = critical_section::with(|cs| {
            let mut groups = self.groups.borrow_ref_mut(cs);
            let left = groups.pop();
            (left, groups.is_empty())
        });
        assert!(left == Some(group), "unbalanced ISR exit for group {}", group);
        outermost.then(|| self.yield_requested.swap(false, Ordering::AcqRel))
    }

    /// The innermost active ISR group
    pub fn current(&self) -> Option<ContextId> {
        critical_section::with(|cs| self.groups.borrow_ref(cs).last().copied())
    }

    pub fn depth(&self) -> usize {
        critical_section::with(|cs| self.groups.borrow_ref(cs).len())
    }

    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Remember that leaving the outermost interrupt must yield
    pub fn request_yield(&self) {
        self.yield_requested.store(true, Ordering::Release);
    }
}

impl core::fmt::Debug for IsrState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IsrState")
            .field("current", &self.current())
            .field("depth", &self.depth())
            .finish()
    }
}

impl Default for IsrState {
    fn default() -> Self {
        Self::new()
    }
}
