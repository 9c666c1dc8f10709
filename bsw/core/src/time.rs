//! System time base
//!
//! Timeouts are kept in a free-running 32-bit microsecond counter that wraps
//! roughly every 71 minutes. Two timestamps are compared through their signed
//! difference, so ordering stays correct across the wrap as long as the
//! distance between them is below 2^31 µs.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Largest delay or period a timeout accepts, in microseconds
pub const MAX_DELAY_US: u32 = i32::MAX as u32;

/// Unit of a delay or period, expressed as its multiplier to microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TimeUnit {
    Microseconds = 1,
    Milliseconds = 1_000,
    Seconds = 1_000_000,
}

impl TimeUnit {
    /// Microseconds per unit
    pub const fn multiplier(self) -> u32 {
        self as u32
    }

    /// Convert `value` in this unit to microseconds, saturating on overflow
    pub const fn to_micros(self, value: u32) -> u32 {
        value.saturating_mul(self.multiplier())
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Microseconds => write!(f, "us"),
            TimeUnit::Milliseconds => write!(f, "ms"),
            TimeUnit::Seconds => write!(f, "s"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TimeUnit {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            TimeUnit::Microseconds => defmt::write!(fmt, "us"),
            TimeUnit::Milliseconds => defmt::write!(fmt, "ms"),
            TimeUnit::Seconds => defmt::write!(fmt, "s"),
        }
    }
}

/// Signed distance from `earlier` to `later` on the wrapping time base
#[inline]
pub const fn time_diff(later: u32, earlier: u32) -> i32 {
    later.wrapping_sub(earlier) as i32
}

/// True once `now` has reached `due`
#[inline]
pub const fn is_due(due: u32, now: u32) -> bool {
    time_diff(due, now) <= 0
}

/// Source of the free-running system counters.
pub trait SystemClock {
    /// Microseconds since start-up, wrapping at 2^32
    fn system_time_us(&self) -> u32;

    /// Ticks of the runtime measurement clock, wrapping at 2^32
    fn system_ticks(&self) -> u32;
}

impl<C: SystemClock + ?Sized> SystemClock for &C {
    fn system_time_us(&self) -> u32 {
        (**self).system_time_us()
    }

    fn system_ticks(&self) -> u32 {
        (**self).system_ticks()
    }
}

/// A clock driven by hand.
///
/// Used for simulation and deterministic tests; both counters advance
/// together, one tick per `us_per_tick` microseconds.
#[derive(Debug)]
pub struct ManualClock {
    time_us: AtomicU32,
    us_per_tick: u32,
}

impl ManualClock {
    pub const fn new(us_per_tick: u32) -> Self {
        assert!(us_per_tick > 0);
        Self {
            time_us: AtomicU32::new(0),
            us_per_tick,
        }
    }

    /// Jump to an absolute time
    pub fn set_us(&self, time_us: u32) {
        self.time_us.store(time_us, Ordering::SeqCst);
    }

    pub fn advance_us(&self, delta_us: u32) {
        let now = self.time_us.load(Ordering::SeqCst);
        self.time_us.store(now.wrapping_add(delta_us), Ordering::SeqCst);
    }

    pub fn advance_ticks(&self, ticks: u32) {
        self.advance_us(ticks.wrapping_mul(self.us_per_tick));
    }

    pub fn advance(&self, delay: u32, unit: TimeUnit) {
        self.advance_us(unit.to_micros(delay));
    }
}

impl SystemClock for ManualClock {
    fn system_time_us(&self) -> u32 {
        self.time_us.load(Ordering::SeqCst)
    }

    fn system_ticks(&self) -> u32 {
        self.time_us.load(Ordering::SeqCst) / self.us_per_tick
    }
}
