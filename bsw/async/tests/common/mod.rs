//! Deterministic RTOS stand-in for the adapter tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use bsw_async::{BinarySignal, EventMask, IsrState, Rtos};
use bsw_core::{ContextHook, ContextId, ManualClock, SystemClock};

pub const TICK_US: u32 = 1_000;

pub fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

#[derive(Default)]
pub struct SignalControl {
    /// Tick budgets passed to `wait`, in call order
    pub waits: Mutex<Vec<u32>>,
    /// Release the signal on the n-th unsuccessful wait; 0 disables
    pub release_after: AtomicU32,
    /// What `set_from_isr` reports
    pub wakes_higher: AtomicBool,
}

pub struct FakeSignal {
    bit: AtomicBool,
    control: Arc<SignalControl>,
}

impl BinarySignal for FakeSignal {
    fn set(&self) {
        self.bit.store(true, Ordering::SeqCst);
    }

    fn set_from_isr(&self) -> bool {
        self.bit.store(true, Ordering::SeqCst);
        self.control.wakes_higher.load(Ordering::SeqCst)
    }

    fn wait(&self, ticks: u32) -> bool {
        self.control.waits.lock().expect("signal lock").push(ticks);
        if self.bit.swap(false, Ordering::SeqCst) {
            return true;
        }
        match self.control.release_after.load(Ordering::SeqCst) {
            0 => false,
            1 => {
                self.control.release_after.store(0, Ordering::SeqCst);
                true
            }
            n => {
                self.control.release_after.store(n - 1, Ordering::SeqCst);
                false
            }
        }
    }
}

pub struct FakeRtos {
    pub clock: ManualClock,
    current: AtomicU8,
    isr: IsrState,
    notifications: [AtomicU32; 8],
    pub notify_calls: AtomicU32,
    pub isr_notify_calls: AtomicU32,
    pub isr_wakes_higher: AtomicBool,
    pub yields: AtomicU32,
    pub event_waits: Mutex<Vec<(ContextId, u32)>>,
    pub signals: Arc<SignalControl>,
}

impl FakeRtos {
    pub fn new() -> Self {
        Self {
            clock: ManualClock::new(TICK_US),
            current: AtomicU8::new(0),
            isr: IsrState::new(),
            notifications: Default::default(),
            notify_calls: AtomicU32::new(0),
            isr_notify_calls: AtomicU32::new(0),
            isr_wakes_higher: AtomicBool::new(false),
            yields: AtomicU32::new(0),
            event_waits: Mutex::new(Vec::new()),
            signals: Arc::new(SignalControl::default()),
        }
    }

    /// Pretend the RTOS switched to `task`
    pub fn switch_to(&self, task: ContextId) {
        self.current.store(task.raw(), Ordering::SeqCst);
    }

    pub fn pending(&self, task: ContextId) -> EventMask {
        self.notifications[task.index()].load(Ordering::SeqCst)
    }
}

impl SystemClock for FakeRtos {
    fn system_time_us(&self) -> u32 {
        self.clock.system_time_us()
    }

    fn system_ticks(&self) -> u32 {
        self.clock.system_ticks()
    }
}

impl Rtos for FakeRtos {
    type Signal = FakeSignal;

    fn tick_period_us(&self) -> u32 {
        TICK_US
    }

    fn current_task(&self) -> ContextId {
        ContextId::new(self.current.load(Ordering::SeqCst))
    }

    fn isr_state(&self) -> &IsrState {
        &self.isr
    }

    fn notify(&self, task: ContextId, events: EventMask) {
        self.notify_calls.fetch_add(1, Ordering::SeqCst);
        self.notifications[task.index()].fetch_or(events, Ordering::SeqCst);
    }

    fn notify_from_isr(&self, task: ContextId, events: EventMask) -> bool {
        self.isr_notify_calls.fetch_add(1, Ordering::SeqCst);
        self.notifications[task.index()].fetch_or(events, Ordering::SeqCst);
        self.isr_wakes_higher.load(Ordering::SeqCst)
    }

    fn wait_events(&self, task: ContextId, ticks: u32) -> EventMask {
        self.event_waits.lock().expect("event lock").push((task, ticks));
        self.notifications[task.index()].swap(0, Ordering::SeqCst)
    }

    fn yield_from_isr(&self) {
        self.yields.fetch_add(1, Ordering::SeqCst);
    }

    fn create_signal(&self) -> FakeSignal {
        FakeSignal {
            bit: AtomicBool::new(false),
            control: self.signals.clone(),
        }
    }
}

/// Hook that records every call
#[derive(Default)]
pub struct RecordingHook {
    pub calls: Mutex<Vec<(&'static str, ContextId)>>,
}

impl RecordingHook {
    pub fn take(&self) -> Vec<(&'static str, ContextId)> {
        std::mem::take(&mut *self.calls.lock().expect("hook lock"))
    }
}

impl ContextHook for RecordingHook {
    fn enter_task(&self, task: ContextId) {
        self.calls.lock().expect("hook lock").push(("enter_task", task));
    }

    fn leave_task(&self, task: ContextId) {
        self.calls.lock().expect("hook lock").push(("leave_task", task));
    }

    fn enter_isr_group(&self, group: ContextId) {
        self.calls.lock().expect("hook lock").push(("enter_isr", group));
    }

    fn leave_isr_group(&self, group: ContextId) {
        self.calls.lock().expect("hook lock").push(("leave_isr", group));
    }
}
