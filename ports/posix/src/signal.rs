//! Binary signal on a condition variable

use std::time::{Duration, Instant};

use bsw_async::BinarySignal;
use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct SignalState {
    set: bool,
    waiters: usize,
}

/// One-bit signal shared between threads
#[derive(Debug)]
pub struct PosixSignal {
    state: Mutex<SignalState>,
    changed: Condvar,
    tick_period: Duration,
}

impl PosixSignal {
    pub(crate) fn new(tick_period_us: u32) -> Self {
        Self {
            state: Mutex::new(SignalState::default()),
            changed: Condvar::new(),
            tick_period: Duration::from_micros(u64::from(tick_period_us)),
        }
    }

    /// Set the bit; returns whether a thread was blocked on it
    fn raise(&self) -> bool {
        let mut state = self.state.lock();
        state.set = true;
        let released = state.waiters > 0;
        drop(state);
        self.changed.notify_one();
        released
    }
}

impl BinarySignal for PosixSignal {
    fn set(&self) {
        self.raise();
    }

    fn set_from_isr(&self) -> bool {
        self.raise()
    }

    fn wait(&self, ticks: u32) -> bool {
        let mut state = self.state.lock();
        if ticks > 0 && !state.set {
            let deadline = Instant::now() + self.tick_period * ticks;
            state.waiters += 1;
            while !state.set {
                if self.changed.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
            state.waiters -= 1;
        }
        std::mem::replace(&mut state.set, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_poll_consumes_bit() {
        let signal = PosixSignal::new(1_000);
        assert!(!signal.wait(0));
        signal.set();
        signal.set();
        assert!(signal.wait(0));
        assert!(!signal.wait(0));
    }

    #[test]
    fn test_wait_times_out() {
        let signal = PosixSignal::new(1_000);
        let started = Instant::now();
        assert!(!signal.wait(5));
        assert!(started.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_set_releases_blocked_waiter() {
        let signal = Arc::new(PosixSignal::new(1_000));
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait(10_000))
        };
        while signal.state.lock().waiters == 0 {
            thread::yield_now();
        }
        assert!(signal.set_from_isr());
        assert!(waiter.join().expect("waiter thread"));
    }
}
