//! `Rtos` binding on std threads

use std::cell::Cell;
use std::time::{Duration, Instant};

use bsw_async::{EventMask, IsrState, Rtos};
use bsw_core::{ContextId, SystemClock, TASK_IDLE};
use parking_lot::{Condvar, Mutex};

use crate::signal::PosixSignal;

/// One millisecond ticks unless configured otherwise
pub const DEFAULT_TICK_PERIOD_US: u32 = 1_000;

thread_local! {
    static CURRENT_TASK: Cell<ContextId> = const { Cell::new(TASK_IDLE) };
    // Each thread acts as its own core for interrupt simulation. The state is
    // leaked so the binding can hand out plain references.
    static ISR_STATE: &'static IsrState = Box::leak(Box::new(IsrState::new()));
}

#[derive(Debug, Default)]
struct WordState {
    pending: EventMask,
    waiting: bool,
}

/// Notification word of one task context
#[derive(Debug, Default)]
struct NotificationWord {
    state: Mutex<WordState>,
    changed: Condvar,
}

impl NotificationWord {
    fn post(&self, events: EventMask) -> bool {
        let mut state = self.state.lock();
        state.pending |= events;
        let released = state.waiting;
        drop(state);
        self.changed.notify_all();
        released
    }

    fn take(&self, timeout: Option<Duration>) -> EventMask {
        let mut state = self.state.lock();
        if let Some(timeout) = timeout {
            let deadline = Instant::now() + timeout;
            state.waiting = true;
            while state.pending == 0 {
                if self.changed.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
            state.waiting = false;
        }
        std::mem::take(&mut state.pending)
    }
}

/// Host RTOS: one notification word per task context and a monotonic clock.
///
/// The thread that calls into the adapter decides the current context. New
/// threads start out as the idle task; [`PosixRtos::bind_current_task`]
/// turns a thread into a task context.
#[derive(Debug)]
pub struct PosixRtos {
    origin: Instant,
    tick_period_us: u32,
    words: Box<[NotificationWord]>,
}

impl PosixRtos {
    /// Binding for `tasks` task contexts, including the idle task
    pub fn new(tasks: usize) -> Self {
        Self::with_tick_period(tasks, DEFAULT_TICK_PERIOD_US)
    }

    pub fn with_tick_period(tasks: usize, tick_period_us: u32) -> Self {
        assert!(tick_period_us > 0, "tick period must be positive");
        Self {
            origin: Instant::now(),
            tick_period_us,
            words: (0..tasks).map(|_| NotificationWord::default()).collect(),
        }
    }

    /// Make the calling thread run as task `task`
    pub fn bind_current_task(task: ContextId) {
        CURRENT_TASK.with(|current| current.set(task));
    }

    fn word(&self, task: ContextId) -> &NotificationWord {
        let index = task.index();
        assert!(index < self.words.len(), "no notification word for task {}", task);
        &self.words[index]
    }

    fn tick_duration(&self, ticks: u32) -> Duration {
        Duration::from_micros(u64::from(self.tick_period_us) * u64::from(ticks))
    }
}

impl SystemClock for PosixRtos {
    fn system_time_us(&self) -> u32 {
        // wraps like a hardware counter
        self.origin.elapsed().as_micros() as u32
    }

    fn system_ticks(&self) -> u32 {
        (self.origin.elapsed().as_micros() / u128::from(self.tick_period_us)) as u32
    }
}

impl Rtos for PosixRtos {
    type Signal = PosixSignal;

    fn tick_period_us(&self) -> u32 {
        self.tick_period_us
    }

    fn current_task(&self) -> ContextId {
        CURRENT_TASK.with(Cell::get)
    }

    fn isr_state(&self) -> &IsrState {
        ISR_STATE.with(|state| *state)
    }

    fn notify(&self, task: ContextId, events: EventMask) {
        self.word(task).post(events);
    }

    fn notify_from_isr(&self, task: ContextId, events: EventMask) -> bool {
        self.word(task).post(events)
    }

    fn wait_events(&self, task: ContextId, ticks: u32) -> EventMask {
        let timeout = (ticks > 0).then(|| self.tick_duration(ticks));
        self.word(task).take(timeout)
    }

    fn yield_from_isr(&self) {
        std::thread::yield_now();
    }

    fn create_signal(&self) -> PosixSignal {
        PosixSignal::new(self.tick_period_us)
    }
}
