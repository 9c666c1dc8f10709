//! Function execution points
//!
//! A [`FunctionPoint`] measures a stretch of code inside a task the same way
//! the monitor measures whole contexts. Points are `'static`, join the
//! monitor's registry on first use and stay there, kept in name order.

use bsw_core::{Link, Linked, SystemClock};

use crate::monitor::RuntimeMonitor;
use crate::statistics::RuntimeStatistics;

/// Named measurement point.
///
/// ```ignore
/// static DECODE: FunctionPoint = FunctionPoint::new("decode");
///
/// fn decode(frame: &Frame) {
///     let _scope = MONITOR.measure(&DECODE);
///     // ...
/// }
/// ```
///
/// A point belongs to one monitor and must not be entered again before it
/// was left.
#[derive(Debug)]
pub struct FunctionPoint {
    name: &'static str,
    pub(crate) statistics: RuntimeStatistics,
    link: Link<FunctionPoint>,
}

impl FunctionPoint {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            statistics: RuntimeStatistics::new(),
            link: Link::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True between enter and leave
    pub fn is_active(&self) -> bool {
        self.statistics.is_active()
    }
}

impl Linked for FunctionPoint {
    fn link(&self) -> &Link<Self> {
        &self.link
    }
}

/// Leaves its point when dropped
#[must_use = "the measurement ends when the scope is dropped"]
pub struct FunctionScope<'a, C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize> {
    monitor: &'a RuntimeMonitor<C, TASKS, ISR_GROUPS>,
    point: &'static FunctionPoint,
}

impl<'a, C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize>
    FunctionScope<'a, C, TASKS, ISR_GROUPS>
{
    pub(crate) fn new(
        monitor: &'a RuntimeMonitor<C, TASKS, ISR_GROUPS>,
        point: &'static FunctionPoint,
    ) -> Self {
        monitor.enter_function(point);
        Self { monitor, point }
    }
}

impl<C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize> Drop
    for FunctionScope<'_, C, TASKS, ISR_GROUPS>
{
    fn drop(&mut self) {
        self.monitor.leave_function(self.point);
    }
}

/// Registered points in name order
#[derive(Debug, Clone)]
pub struct Functions {
    pub(crate) next: Option<&'static FunctionPoint>,
}

impl Iterator for Functions {
    type Item = &'static FunctionPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.next?;
        // Points are never unlinked, so the walk may drop the lock between steps
        self.next = critical_section::with(|cs| point.link.next(cs));
        Some(point)
    }
}
