//! Adapter configuration

use crate::rtos::MAX_ISR_NESTING;

/// Configuration for an [`AsyncAdapter`](crate::AsyncAdapter).
///
/// Sizing that must be known at compile time (number of task contexts) is a
/// const generic of the adapter; everything here is runtime tunable.
#[derive(Debug, Clone)]
pub struct AsyncConfig {
    pub name: &'static str,
    /// Ticks a task waits for events when no timeout is armed; 0 is read
    /// as 1 since a zero wait polls
    pub wait_events_tick_count: u32,
    /// Ticks a future waits per attempt outside the idle task
    pub future_wait_ticks: u32,
    /// Interrupt nesting depth accepted by `enter_isr`
    pub max_isr_nesting: usize,
    /// Task names, indexed by context id
    pub task_names: &'static [&'static str],
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            name: "BSW",
            wait_events_tick_count: 100,
            future_wait_ticks: 10,
            max_isr_nesting: MAX_ISR_NESTING,
            task_names: &[],
        }
    }
}

impl AsyncConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> AsyncConfigBuilder {
        AsyncConfigBuilder::default()
    }

    /// Name of task `index`, `"task"` if none was configured
    pub fn task_name(&self, index: usize) -> &'static str {
        self.task_names.get(index).copied().unwrap_or("task")
    }
}

/// Builder for [`AsyncConfig`].
#[derive(Debug, Clone, Default)]
pub struct AsyncConfigBuilder {
    config: AsyncConfig,
}

impl AsyncConfigBuilder {
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    /// Sets the idle wait of a task; clamped to at least one tick.
    pub fn wait_events_tick_count(mut self, ticks: u32) -> Self {
        self.config.wait_events_tick_count = ticks.max(1);
        self
    }

    /// Sets the per-attempt wait of a future; clamped to at least one tick.
    pub fn future_wait_ticks(mut self, ticks: u32) -> Self {
        self.config.future_wait_ticks = ticks.max(1);
        self
    }

    /// Sets the accepted interrupt nesting depth, at most
    /// [`MAX_ISR_NESTING`].
    pub fn max_isr_nesting(mut self, depth: usize) -> Self {
        self.config.max_isr_nesting = depth.min(MAX_ISR_NESTING);
        self
    }

    pub fn task_names(mut self, names: &'static [&'static str]) -> Self {
        self.config.task_names = names;
        self
    }

    pub fn build(self) -> AsyncConfig {
        self.config
    }
}
