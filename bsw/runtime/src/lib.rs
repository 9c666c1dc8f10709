#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! # BSW Runtime
//!
//! Runtime statistics per execution context. [`RuntimeMonitor`] implements
//! the context hook: the dispatch trampoline calls it around every task and
//! ISR group invocation, and a reporting task reads the aggregated numbers
//! through [`StatisticsSnapshot`]s or renders them with
//! [`StatisticsReport`]. Stretches of task code are measured the same way
//! through [`FunctionPoint`]s.

pub mod function;
pub mod monitor;
pub mod report;
pub mod statistics;

pub use function::{FunctionPoint, FunctionScope, Functions};
pub use monitor::RuntimeMonitor;
pub use report::StatisticsReport;
pub use statistics::{RuntimeStatistics, StatisticsSnapshot};
