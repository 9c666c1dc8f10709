//! Schedule handles

use core::cell::Cell;
use core::fmt;

use bsw_core::{ContextId, Link, Linked, Runnable, CONTEXT_INVALID};
use critical_section::{CriticalSection, Mutex};

use crate::scheduler::Scheduler;

/// How a timeout re-arms after firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutMode {
    /// Fire once
    OneShot,
    /// Fire every period until canceled
    FixedRate,
}

/// Lifecycle of a timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutState {
    /// Never armed
    Idle,
    /// Armed and waiting in a timer list
    Scheduled,
    /// One-shot timeout that has fired
    Expired,
    /// Disarmed by `cancel`
    Canceled,
}

#[cfg(feature = "defmt")]
impl defmt::Format for TimeoutState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            TimeoutState::Idle => defmt::write!(fmt, "Idle"),
            TimeoutState::Scheduled => defmt::write!(fmt, "Scheduled"),
            TimeoutState::Expired => defmt::write!(fmt, "Expired"),
            TimeoutState::Canceled => defmt::write!(fmt, "Canceled"),
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct Slot {
    pub runnable: Option<&'static dyn Runnable>,
    pub context: ContextId,
    pub mode: TimeoutMode,
    pub period_us: u32,
    pub due_us: u32,
    pub state: TimeoutState,
}

impl Slot {
    const IDLE: Slot = Slot {
        runnable: None,
        context: CONTEXT_INVALID,
        mode: TimeoutMode::OneShot,
        period_us: 0,
        due_us: 0,
        state: TimeoutState::Idle,
    };
}

/// Handle for one delayed or periodic execution request.
///
/// Timeouts are owned by the caller, typically as a `static` next to the
/// runnable they trigger, and are only modified by the scheduler. A timeout
/// belongs to the context it was armed for; only that context may cancel it.
pub struct Timeout {
    link: Link<Timeout>,
    slot: Mutex<Cell<Slot>>,
}

impl Timeout {
    pub const fn new() -> Self {
        Self {
            link: Link::new(),
            slot: Mutex::new(Cell::new(Slot::IDLE)),
        }
    }

    pub fn state(&self) -> TimeoutState {
        critical_section::with(|cs| self.slot(cs).state)
    }

    /// Context the timeout was last armed for, or [`CONTEXT_INVALID`]
    pub fn context(&self) -> ContextId {
        critical_section::with(|cs| self.slot(cs).context)
    }

    pub fn mode(&self) -> TimeoutMode {
        critical_section::with(|cs| self.slot(cs).mode)
    }

    /// Period of a fixed-rate timeout in microseconds
    pub fn period_us(&self) -> u32 {
        critical_section::with(|cs| self.slot(cs).period_us)
    }

    pub fn is_scheduled(&self) -> bool {
        self.state() == TimeoutState::Scheduled
    }

    /// Cancel through `scheduler`; see [`Scheduler::cancel`].
    pub fn cancel<S: Scheduler + ?Sized>(&self, scheduler: &S) {
        scheduler.cancel(self);
    }

    pub(crate) fn slot(&self, cs: CriticalSection<'_>) -> Slot {
        self.slot.borrow(cs).get()
    }

    pub(crate) fn update(&self, cs: CriticalSection<'_>, f: impl FnOnce(&mut Slot)) {
        let cell = self.slot.borrow(cs);
        let mut slot = cell.get();
        f(&mut slot);
        cell.set(slot);
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new()
    }
}

impl Linked for Timeout {
    fn link(&self) -> &Link<Self> {
        &self.link
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = critical_section::with(|cs| self.slot(cs));
        f.debug_struct("Timeout")
            .field("context", &slot.context)
            .field("mode", &slot.mode)
            .field("state", &slot.state)
            .field("period_us", &slot.period_us)
            .field("due_us", &slot.due_us)
            .finish()
    }
}
