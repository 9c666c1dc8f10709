//! Runtime monitor
//!
//! Timestamps every task and ISR group invocation through the
//! [`ContextHook`] callbacks and charges each context for the time it
//! actually ran. Interrupts that preempt an invocation are subtracted from
//! it, so the sum over all slots never exceeds wall time.
//!
//! Function points nest inside task code. A function is charged neither for
//! the interrupts nor for the nested function points that ran during it.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use bsw_core::{ContextHook, ContextId, Linked, Queue, SystemClock};

use crate::function::{FunctionPoint, FunctionScope, Functions};
use crate::statistics::{RuntimeStatistics, StatisticsSnapshot};

/// Per-context runtime bookkeeping for `TASKS` task contexts and
/// `ISR_GROUPS` interrupt groups.
///
/// Every slot is written only by its own context. Reset does not touch the
/// slots; it advances an epoch that makes older data read as zero.
pub struct RuntimeMonitor<C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize> {
    clock: C,
    tasks: [RuntimeStatistics; TASKS],
    isr_groups: [RuntimeStatistics; ISR_GROUPS],
    /// Net ticks spent in ISR groups since construction
    isr_ticks: AtomicU32,
    /// Net ticks spent in function points since construction
    function_ticks: AtomicU32,
    functions: Queue<FunctionPoint>,
    epoch: AtomicU32,
    running: AtomicBool,
    window_start: AtomicU32,
    window_end: AtomicU32,
}

impl<C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize>
    RuntimeMonitor<C, TASKS, ISR_GROUPS>
{
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            tasks: [const { RuntimeStatistics::new() }; TASKS],
            isr_groups: [const { RuntimeStatistics::new() }; ISR_GROUPS],
            isr_ticks: AtomicU32::new(0),
            function_ticks: AtomicU32::new(0),
            functions: Queue::new(),
            epoch: AtomicU32::new(0),
            running: AtomicBool::new(false),
            window_start: AtomicU32::new(0),
            window_end: AtomicU32::new(0),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn task_count(&self) -> usize {
        TASKS
    }

    pub const fn isr_group_count(&self) -> usize {
        ISR_GROUPS
    }

    /// Open the measurement window at the current time
    pub fn start(&self) {
        let now = self.clock.system_ticks();
        self.window_start.store(now, Ordering::Relaxed);
        self.window_end.store(now, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
        log::debug!("runtime measurement started at tick {}", now);
    }

    /// Close the measurement window
    pub fn stop(&self) {
        self.window_end
            .store(self.clock.system_ticks(), Ordering::Relaxed);
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Length of the current window in ticks
    pub fn total_runtime(&self) -> u32 {
        let end = if self.is_running() {
            self.clock.system_ticks()
        } else {
            self.window_end.load(Ordering::Relaxed)
        };
        end.wrapping_sub(self.window_start.load(Ordering::Relaxed))
    }

    /// Clear all statistics and return the length of the window that ended.
    ///
    /// A running window restarts at the current time.
    pub fn reset(&self) -> u32 {
        let total = self.total_runtime();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if self.is_running() {
            let now = self.clock.system_ticks();
            self.window_start.store(now, Ordering::Relaxed);
            self.window_end.store(now, Ordering::Relaxed);
        } else {
            let end = self.window_end.load(Ordering::Relaxed);
            self.window_start.store(end, Ordering::Relaxed);
        }
        log::debug!("runtime statistics reset after {} ticks", total);
        total
    }

    pub fn task_statistics(&self, task: usize) -> StatisticsSnapshot {
        assert!(task < TASKS, "task index {} out of range", task);
        self.tasks[task].snapshot(self.epoch())
    }

    pub fn isr_group_statistics(&self, group: usize) -> StatisticsSnapshot {
        assert!(group < ISR_GROUPS, "ISR group index {} out of range", group);
        self.isr_groups[group].snapshot(self.epoch())
    }

    /// Add `point` to the registry so reports list it before its first run.
    /// Registering twice is harmless.
    pub fn register_function(&self, point: &'static FunctionPoint) {
        let added = critical_section::with(|cs| {
            if point.link().is_enqueued(cs) {
                return false;
            }
            let after = self
                .functions
                .iter(cs)
                .take_while(|registered| registered.name() <= point.name())
                .last();
            self.functions.insert_after(cs, after, point);
            true
        });
        if added {
            log::debug!("function point {} registered", point.name());
        }
    }

    /// Start measuring `point`; registers it on first use
    pub fn enter_function(&self, point: &'static FunctionPoint) {
        if !critical_section::with(|cs| point.link().is_enqueued(cs)) {
            self.register_function(point);
        }
        point.statistics.begin(self.clock.system_ticks(), self.nested_ticks());
    }

    /// Stop measuring `point`. Ignored if it was not entered.
    pub fn leave_function(&self, point: &FunctionPoint) {
        let now = self.clock.system_ticks();
        if let Some(net) = point.statistics.end(now, self.nested_ticks(), self.epoch()) {
            self.function_ticks.fetch_add(net, Ordering::Relaxed);
        }
    }

    /// Measure `point` until the returned scope is dropped
    pub fn measure(&self, point: &'static FunctionPoint) -> FunctionScope<'_, C, TASKS, ISR_GROUPS> {
        FunctionScope::new(self, point)
    }

    pub fn function_statistics(&self, point: &FunctionPoint) -> StatisticsSnapshot {
        point.statistics.snapshot(self.epoch())
    }

    /// Registered function points in name order
    pub fn functions(&self) -> Functions {
        Functions {
            next: critical_section::with(|cs| self.functions.front(cs)),
        }
    }

    fn nested_ticks(&self) -> u32 {
        self.isr_ticks
            .load(Ordering::Relaxed)
            .wrapping_add(self.function_ticks.load(Ordering::Relaxed))
    }

    fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    fn task_slot(&self, task: ContextId) -> &RuntimeStatistics {
        let index = task.index();
        assert!(index < TASKS, "task index {} out of range", index);
        &self.tasks[index]
    }

    fn isr_slot(&self, group: ContextId) -> &RuntimeStatistics {
        let index = group.index();
        assert!(index < ISR_GROUPS, "ISR group index {} out of range", index);
        &self.isr_groups[index]
    }
}

impl<C, const TASKS: usize, const ISR_GROUPS: usize> ContextHook
    for RuntimeMonitor<C, TASKS, ISR_GROUPS>
where
    C: SystemClock + Sync,
{
    fn enter_task(&self, task: ContextId) {
        let slot = self.task_slot(task);
        slot.begin(self.clock.system_ticks(), self.isr_ticks.load(Ordering::Relaxed));
    }

    fn leave_task(&self, task: ContextId) {
        let slot = self.task_slot(task);
        let now = self.clock.system_ticks();
        slot.end(now, self.isr_ticks.load(Ordering::Relaxed), self.epoch());
    }

    fn enter_isr_group(&self, group: ContextId) {
        let slot = self.isr_slot(group);
        slot.begin(self.clock.system_ticks(), self.isr_ticks.load(Ordering::Relaxed));
    }

    fn leave_isr_group(&self, group: ContextId) {
        let slot = self.isr_slot(group);
        let now = self.clock.system_ticks();
        if let Some(net) = slot.end(now, self.isr_ticks.load(Ordering::Relaxed), self.epoch()) {
            self.isr_ticks.fetch_add(net, Ordering::Relaxed);
        }
    }
}

impl<C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize> core::fmt::Debug
    for RuntimeMonitor<C, TASKS, ISR_GROUPS>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RuntimeMonitor")
            .field("tasks", &TASKS)
            .field("isr_groups", &ISR_GROUPS)
            .field("running", &self.is_running())
            .field("epoch", &self.epoch())
            .finish()
    }
}
