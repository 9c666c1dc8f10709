//! Statistics slot of one execution context
//!
//! A slot is written only by the context it describes, on leaving an
//! invocation. It holds two banks and a version counter: the writer fills
//! the bank readers are not looking at and then publishes it by bumping the
//! version. A reader copies the published bank and retries only if a newer
//! one was published meanwhile, so every snapshot is one the writer
//! produced. The writer never waits, and a writer preempted in the middle of
//! an update leaves the published bank untouched, so a reader cannot starve
//! on it.
//!
//! Resetting never writes into a slot. The monitor advances an epoch instead;
//! a slot whose epoch is behind reads as zero and restarts from zero on its
//! next update.

use core::fmt;
use core::sync::atomic::{fence, AtomicBool, AtomicU32, Ordering};

/// Point-in-time copy of a statistics slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatisticsSnapshot {
    /// Cumulative busy ticks
    pub busy_ticks: u32,
    /// Number of completed invocations
    pub count: u32,
    /// Longest single invocation in ticks
    pub max_ticks: u32,
}

impl StatisticsSnapshot {
    pub fn average_ticks(&self) -> u32 {
        if self.count == 0 {
            0
        } else {
            self.busy_ticks / self.count
        }
    }

    /// Busy share of `total_ticks` in hundredths of a percent
    pub fn load_permyriad(&self, total_ticks: u32) -> u32 {
        if total_ticks == 0 {
            0
        } else {
            ((u64::from(self.busy_ticks) * 10_000) / u64::from(total_ticks)) as u32
        }
    }

    /// Busy share of `total_ticks` in percent
    pub fn percentage_of(&self, total_ticks: u32) -> f32 {
        self.load_permyriad(total_ticks) as f32 / 100.0
    }
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "busy={} count={} max={}",
            self.busy_ticks, self.count, self.max_ticks
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StatisticsSnapshot {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "busy={} count={} max={}",
            self.busy_ticks,
            self.count,
            self.max_ticks
        );
    }
}

/// One published set of counters
#[derive(Debug)]
struct Bank {
    epoch: AtomicU32,
    busy_ticks: AtomicU32,
    count: AtomicU32,
    max_ticks: AtomicU32,
}

impl Bank {
    const fn new() -> Self {
        Self {
            epoch: AtomicU32::new(0),
            busy_ticks: AtomicU32::new(0),
            count: AtomicU32::new(0),
            max_ticks: AtomicU32::new(0),
        }
    }

    fn read(&self, epoch: u32) -> StatisticsSnapshot {
        let snapshot = StatisticsSnapshot {
            busy_ticks: self.busy_ticks.load(Ordering::Relaxed),
            count: self.count.load(Ordering::Relaxed),
            max_ticks: self.max_ticks.load(Ordering::Relaxed),
        };
        if self.epoch.load(Ordering::Relaxed) == epoch {
            snapshot
        } else {
            StatisticsSnapshot::default()
        }
    }

    fn write(&self, epoch: u32, snapshot: StatisticsSnapshot) {
        self.epoch.store(epoch, Ordering::Relaxed);
        self.busy_ticks.store(snapshot.busy_ticks, Ordering::Relaxed);
        self.count.store(snapshot.count, Ordering::Relaxed);
        self.max_ticks.store(snapshot.max_ticks, Ordering::Relaxed);
    }
}

/// Runtime statistics of one context plus the bookkeeping of its current
/// invocation.
#[derive(Debug)]
pub struct RuntimeStatistics {
    /// Number of banks published so far; the low bit selects the current one
    version: AtomicU32,
    banks: [Bank; 2],
    active: AtomicBool,
    entered_at: AtomicU32,
    preempted_at: AtomicU32,
}

impl RuntimeStatistics {
    pub const fn new() -> Self {
        Self {
            version: AtomicU32::new(0),
            banks: [Bank::new(), Bank::new()],
            active: AtomicBool::new(false),
            entered_at: AtomicU32::new(0),
            preempted_at: AtomicU32::new(0),
        }
    }

    /// Start an invocation at `now`. `preempted` is the monitor's running
    /// total of time spent in whatever may nest inside this invocation.
    pub(crate) fn begin(&self, now: u32, preempted: u32) {
        self.entered_at.store(now, Ordering::Relaxed);
        self.preempted_at.store(preempted, Ordering::Relaxed);
        self.active.store(true, Ordering::Relaxed);
    }

    /// Finish the running invocation and record it under `epoch`.
    ///
    /// Returns the ticks charged to this context: the elapsed time minus the
    /// nested time that accumulated meanwhile. Returns `None` if no invocation was
    /// running.
    pub(crate) fn end(&self, now: u32, preempted: u32, epoch: u32) -> Option<u32> {
        if !self.active.swap(false, Ordering::Relaxed) {
            return None;
        }
        let elapsed = now.wrapping_sub(self.entered_at.load(Ordering::Relaxed));
        let nested = preempted.wrapping_sub(self.preempted_at.load(Ordering::Relaxed));
        let runtime = elapsed.saturating_sub(nested);
        self.add_run(runtime, epoch);
        Some(runtime)
    }

    fn bank(&self, version: u32) -> &Bank {
        &self.banks[(version & 1) as usize]
    }

    /// Account one invocation of `runtime` ticks
    pub fn add_run(&self, runtime: u32, epoch: u32) {
        let version = self.version.load(Ordering::Relaxed);
        // The bank about to be filled may still be read under the previous
        // version; those readers must see the version change
        fence(Ordering::Release);

        let current = self.bank(version).read(epoch);
        let next = StatisticsSnapshot {
            busy_ticks: current.busy_ticks.wrapping_add(runtime),
            count: current.count.wrapping_add(1),
            max_ticks: current.max_ticks.max(runtime),
        };
        self.bank(version.wrapping_add(1)).write(epoch, next);

        self.version.store(version.wrapping_add(1), Ordering::Release);
    }

    /// Consistent copy of the slot as of `epoch`
    pub fn snapshot(&self, epoch: u32) -> StatisticsSnapshot {
        loop {
            let before = self.version.load(Ordering::Acquire);
            let snapshot = self.bank(before).read(epoch);
            fence(Ordering::Acquire);
            if self.version.load(Ordering::Relaxed) == before {
                return snapshot;
            }
            core::hint::spin_loop();
        }
    }

    /// True while an invocation is being measured
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

impl Default for RuntimeStatistics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_run_accumulates() {
        let slot = RuntimeStatistics::new();
        slot.add_run(50, 0);
        slot.add_run(30, 0);
        let snapshot = slot.snapshot(0);
        assert_eq!(snapshot, StatisticsSnapshot { busy_ticks: 80, count: 2, max_ticks: 50 });
        assert_eq!(snapshot.average_ticks(), 40);
    }

    #[test]
    fn test_new_epoch_restarts_slot() {
        let slot = RuntimeStatistics::new();
        slot.add_run(50, 0);
        assert_eq!(slot.snapshot(1), StatisticsSnapshot::default());
        slot.add_run(20, 1);
        assert_eq!(slot.snapshot(1), StatisticsSnapshot { busy_ticks: 20, count: 1, max_ticks: 20 });
    }

    #[test]
    fn test_begin_end_subtracts_preemption() {
        let slot = RuntimeStatistics::new();
        assert_eq!(slot.end(10, 0, 0), None);
        slot.begin(100, 5);
        assert!(slot.is_active());
        assert_eq!(slot.end(160, 15, 0), Some(50));
        assert!(!slot.is_active());
    }

    #[test]
    fn test_elapsed_across_tick_wrap() {
        let slot = RuntimeStatistics::new();
        slot.begin(u32::MAX - 9, 0);
        assert_eq!(slot.end(20, 0, 0), Some(30));
    }

    #[test]
    fn test_snapshot_never_mixes_two_updates() {
        const RUNS: u32 = 200_000;
        const RUNTIME: u32 = 3;
        let slot = RuntimeStatistics::new();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..RUNS {
                    slot.add_run(RUNTIME, 0);
                }
            });

            let mut last_count = 0;
            while last_count < RUNS {
                let snapshot = slot.snapshot(0);
                assert_eq!(snapshot.busy_ticks, snapshot.count * RUNTIME, "{}", snapshot);
                assert!(snapshot.count == 0 || snapshot.max_ticks == RUNTIME, "{}", snapshot);
                assert!(snapshot.count >= last_count);
                last_count = snapshot.count;
            }
        });
    }

    #[test]
    fn test_load() {
        let snapshot = StatisticsSnapshot { busy_ticks: 250, count: 5, max_ticks: 80 };
        assert_eq!(snapshot.load_permyriad(1_000), 2_500);
        assert_eq!(snapshot.percentage_of(1_000), 25.0);
        assert_eq!(snapshot.load_permyriad(0), 0);
    }
}
