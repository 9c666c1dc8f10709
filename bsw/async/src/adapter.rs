//! Scheduler adapter over an RTOS binding

use bsw_core::{
    AsyncError, AsyncResult, ContextHook, ContextId, ExecutionContext, NoHook, Runnable, TimeUnit,
    CONTEXT_INVALID, MAX_DELAY_US,
};

use crate::config::AsyncConfig;
use crate::rtos::{EventMask, Rtos, EVENT_EXECUTE, EVENT_STOP, EVENT_TIMER};
use crate::scheduler::Scheduler;
use crate::task::TaskContext;
use crate::timeout::Timeout;

static NO_HOOK: NoHook = NoHook;

/// Binds task contexts, timeouts and interrupt bookkeeping to one RTOS.
///
/// `TASKS` is the number of task contexts including the idle task (id 0).
/// The adapter is created once at start-up and lives for the whole program;
/// tasks reach it by reference.
///
/// ```ignore
/// static MONITOR: RuntimeMonitor<Clock, 3, 2> = RuntimeMonitor::new(Clock);
///
/// let adapter: AsyncAdapter<_, 3> = AsyncAdapter::new(rtos, AsyncConfig::default())
///     .with_hook(&MONITOR);
/// adapter.execute(context!(1), &WORK)?;
/// ```
pub struct AsyncAdapter<R: Rtos, const TASKS: usize> {
    rtos: R,
    config: AsyncConfig,
    hook: &'static dyn ContextHook,
    contexts: [TaskContext; TASKS],
}

impl<R: Rtos, const TASKS: usize> AsyncAdapter<R, TASKS> {
    pub fn new(rtos: R, config: AsyncConfig) -> Self {
        assert!(
            TASKS > 0 && TASKS < CONTEXT_INVALID.index(),
            "task count must be within 1..255"
        );
        let contexts = core::array::from_fn(|index| {
            TaskContext::new(ContextId::new(index as u8), config.task_name(index))
        });
        log::debug!("{}: {} task contexts", config.name, TASKS);
        Self {
            rtos,
            config,
            hook: &NO_HOOK,
            contexts,
        }
    }

    /// Route context entry and exit to `hook`
    pub fn with_hook(mut self, hook: &'static dyn ContextHook) -> Self {
        self.hook = hook;
        self
    }

    pub fn rtos(&self) -> &R {
        &self.rtos
    }

    pub fn config(&self) -> &AsyncConfig {
        &self.config
    }

    pub fn task_count(&self) -> usize {
        TASKS
    }

    /// Id the RTOS timer task reports
    pub fn timer_task(&self) -> ContextId {
        bsw_core::timer_task(TASKS)
    }

    pub fn task(&self, context: ContextId) -> AsyncResult<&TaskContext> {
        self.contexts
            .get(context.index())
            .ok_or(AsyncError::UnknownContext(context))
    }

    pub fn task_name(&self, context: ContextId) -> Option<&'static str> {
        self.task(context).ok().map(TaskContext::name)
    }

    pub fn is_in_isr(&self) -> bool {
        self.rtos.isr_state().is_active()
    }

    /// Mark entry into an interrupt of `group`. Called first thing by every
    /// interrupt handler that uses the scheduler.
    pub fn enter_isr(&self, group: ContextId) {
        if let Err(err) = self.rtos.isr_state().enter(group, self.config.max_isr_nesting) {
            log::error!("enter_isr({}): {}", group, err);
            panic!("{}", err);
        }
        self.hook.enter_isr_group(group);
    }

    /// Mark exit from an interrupt of `group`.
    ///
    /// When the outermost interrupt is left and a higher-priority task was
    /// released meanwhile, asks the RTOS to switch to it. Returns whether it
    /// did.
    pub fn leave_isr(&self, group: ContextId) -> bool {
        let yield_requested = self.leave_isr_no_yield(group);
        if yield_requested {
            self.rtos.yield_from_isr();
        }
        yield_requested
    }

    /// Like [`leave_isr`](Self::leave_isr) but leaves the context switch to
    /// the caller.
    pub fn leave_isr_no_yield(&self, group: ContextId) -> bool {
        self.hook.leave_isr_group(group);
        self.rtos.isr_state().leave(group).unwrap_or(false)
    }

    /// Ask for a context switch once the outermost interrupt returns
    pub fn request_yield_on_isr_exit(&self) {
        self.rtos.isr_state().request_yield();
    }

    /// True if the caller runs in task `context`
    pub fn verify_context(&self, context: ContextId) -> bool {
        self.current_context() == ExecutionContext::task(context)
    }

    /// Abort unless the caller runs in task `context`
    pub fn assert_context(&self, context: ContextId) {
        let current = self.current_context();
        if current != ExecutionContext::task(context) {
            log::error!("context affinity violated: expected Task({}), running in {}", context, current);
            panic!("context affinity violated: expected Task({}), running in {}", context, current);
        }
    }

    fn post_events(&self, context: ContextId, events: EventMask) {
        if self.is_in_isr() {
            if self.rtos.notify_from_isr(context, events) {
                self.request_yield_on_isr_exit();
            }
        } else {
            self.rtos.notify(context, events);
        }
    }

    fn arm(
        &self,
        context: ContextId,
        timeout: &'static Timeout,
        armed: Option<bool>,
    ) -> AsyncResult<()> {
        match armed {
            None => {
                log::warn!("timeout {:?} is already scheduled", timeout);
                Err(AsyncError::AlreadyScheduled)
            }
            Some(earliest) => {
                if earliest {
                    self.post_events(context, EVENT_TIMER);
                }
                Ok(())
            }
        }
    }

    /// Convert a delay to microseconds, rejecting what the timer cannot hold
    fn delay_us(delay: u32, unit: TimeUnit) -> AsyncResult<u32> {
        let delay_us = unit.to_micros(delay);
        if delay_us > MAX_DELAY_US {
            log::warn!("delay of {}{} out of range", delay, unit);
            return Err(AsyncError::DelayOutOfRange);
        }
        Ok(delay_us)
    }

    fn wait_events(&self, task: &TaskContext) -> EventMask {
        let (ticks, bounded) = task.wait_ticks(
            self.rtos.system_time_us(),
            self.rtos.tick_period_us(),
            self.config.wait_events_tick_count.max(1),
        );
        match self.rtos.wait_events(task.id(), ticks) {
            0 if bounded => EVENT_TIMER,
            events => events,
        }
    }

    /// Event loop of task `context`; returns after [`stop_dispatch`].
    ///
    /// This is the body of every task. Each batch of events is bracketed by
    /// the context hook.
    ///
    /// [`stop_dispatch`]: Self::stop_dispatch
    pub fn dispatch(&self, context: ContextId) -> AsyncResult<()> {
        let task = self.task(context)?;
        self.assert_context(context);
        log::debug!("{}: dispatch started", task.name());
        loop {
            let events = self.wait_events(task);
            if events == 0 {
                continue;
            }
            self.hook.enter_task(context);
            task.handle_events(events, &self.rtos);
            self.hook.leave_task(context);
            if events & EVENT_STOP != 0 {
                break;
            }
        }
        log::debug!("{}: dispatch stopped", task.name());
        Ok(())
    }

    /// Process pending events of `context` without blocking until none are
    /// left. Used by the idle task between its own jobs.
    ///
    /// The whole call is one batch for the context hook.
    pub fn dispatch_while_work(&self, context: ContextId) -> AsyncResult<()> {
        let task = self.task(context)?;
        self.hook.enter_task(context);
        loop {
            task.handle_timeouts(&self.rtos);
            let events = self.rtos.wait_events(context, 0);
            if events == 0 {
                break;
            }
            task.handle_events(events, &self.rtos);
        }
        self.hook.leave_task(context);
        Ok(())
    }

    /// Make the dispatch loop of `context` return
    pub fn stop_dispatch(&self, context: ContextId) -> AsyncResult<()> {
        self.task(context)?;
        self.post_events(context, EVENT_STOP);
        Ok(())
    }
}

impl<R: Rtos, const TASKS: usize> Scheduler for AsyncAdapter<R, TASKS> {
    fn execute(&self, context: ContextId, runnable: &'static dyn Runnable) -> AsyncResult<()> {
        if self.task(context)?.executor().enqueue(runnable) {
            self.post_events(context, EVENT_EXECUTE);
        }
        Ok(())
    }

    fn schedule(
        &self,
        context: ContextId,
        runnable: &'static dyn Runnable,
        timeout: &'static Timeout,
        delay: u32,
        unit: TimeUnit,
    ) -> AsyncResult<()> {
        let task = self.task(context)?;
        let delay_us = Self::delay_us(delay, unit)?;
        let armed = task
            .timer()
            .set(timeout, runnable, context, delay_us, self.rtos.system_time_us());
        self.arm(context, timeout, armed)
    }

    fn schedule_at_fixed_rate(
        &self,
        context: ContextId,
        runnable: &'static dyn Runnable,
        timeout: &'static Timeout,
        period: u32,
        unit: TimeUnit,
    ) -> AsyncResult<()> {
        let task = self.task(context)?;
        let period_us = Self::delay_us(period, unit)?;
        let armed = task
            .timer()
            .set_cyclic(timeout, runnable, context, period_us, self.rtos.system_time_us());
        self.arm(context, timeout, armed)
    }

    fn cancel(&self, timeout: &Timeout) {
        let context = timeout.context();
        let Ok(task) = self.task(context) else {
            return;
        };
        // Expired and canceled handles hold nothing a foreign context could race
        if !timeout.is_scheduled() {
            return;
        }
        self.assert_context(context);
        if task.timer().cancel(timeout) {
            log::debug!("{}: timeout canceled", task.name());
        }
    }

    fn current_context(&self) -> ExecutionContext {
        match self.rtos.isr_state().current() {
            Some(group) => ExecutionContext::isr_group(group),
            None => ExecutionContext::task(self.rtos.current_task()),
        }
    }
}
