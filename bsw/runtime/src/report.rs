//! Statistics table

use core::fmt;

use bsw_core::SystemClock;

use crate::monitor::RuntimeMonitor;
use crate::statistics::StatisticsSnapshot;

const NAME_WIDTH: usize = 12;
const NUMBER_WIDTH: usize = 10;

/// Renders the monitor's statistics as a fixed-width table.
///
/// ```text
/// name               busy      count        max        avg        %
/// task can             80          2         50         40    8.00 %
/// ```
///
/// Contexts without a supplied name are shown by index. Registered function
/// points follow the ISR groups as `func` rows.
pub struct StatisticsReport<'a, C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize> {
    monitor: &'a RuntimeMonitor<C, TASKS, ISR_GROUPS>,
    task_names: &'a [&'a str],
    isr_group_names: &'a [&'a str],
}

impl<'a, C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize>
    StatisticsReport<'a, C, TASKS, ISR_GROUPS>
{
    pub fn new(
        monitor: &'a RuntimeMonitor<C, TASKS, ISR_GROUPS>,
        task_names: &'a [&'a str],
        isr_group_names: &'a [&'a str],
    ) -> Self {
        Self {
            monitor,
            task_names,
            isr_group_names,
        }
    }

    fn write_header(f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<nw$} {:>w$} {:>w$} {:>w$} {:>w$} {:>8}",
            "name",
            "busy",
            "count",
            "max",
            "avg",
            "%",
            nw = NAME_WIDTH + 5,
            w = NUMBER_WIDTH
        )
    }

    fn write_row(
        f: &mut fmt::Formatter<'_>,
        kind: &str,
        name: Option<&str>,
        index: usize,
        stats: StatisticsSnapshot,
        total: u32,
    ) -> fmt::Result {
        write!(f, "{} ", kind)?;
        match name {
            Some(name) => write!(f, "{:<w$}", name, w = NAME_WIDTH)?,
            None => write!(f, "#{:<w$}", index, w = NAME_WIDTH - 1)?,
        }
        let load = stats.load_permyriad(total);
        writeln!(
            f,
            " {:>w$} {:>w$} {:>w$} {:>w$} {:>3}.{:02} %",
            stats.busy_ticks,
            stats.count,
            stats.max_ticks,
            stats.average_ticks(),
            load / 100,
            load % 100,
            w = NUMBER_WIDTH
        )
    }
}

impl<C: SystemClock, const TASKS: usize, const ISR_GROUPS: usize> fmt::Display
    for StatisticsReport<'_, C, TASKS, ISR_GROUPS>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.monitor.total_runtime();
        Self::write_header(f)?;
        for task in 0..TASKS {
            let name = self.task_names.get(task).copied();
            let stats = self.monitor.task_statistics(task);
            Self::write_row(f, "task", name, task, stats, total)?;
        }
        for group in 0..ISR_GROUPS {
            let name = self.isr_group_names.get(group).copied();
            let stats = self.monitor.isr_group_statistics(group);
            Self::write_row(f, "isr ", name, group, stats, total)?;
        }
        for (index, point) in self.monitor.functions().enumerate() {
            let stats = self.monitor.function_statistics(point);
            Self::write_row(f, "func", Some(point.name()), index, stats, total)?;
        }
        writeln!(f, "total {} ticks", total)
    }
}
