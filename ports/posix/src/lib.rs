//! Host port of the BSW async core.
//!
//! Every task context runs on its own OS thread and blocks on a condition
//! variable instead of an RTOS event group. Interrupts are simulated: any
//! thread can bracket a closure with [`simulate_isr`] and is treated as
//! being in that ISR group for the duration.
//!
//! The port exists to run the core and its users on a development machine;
//! there is no real-time behaviour and no priority preemption.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bsw_async::{AsyncAdapter, AsyncConfig};
//! use bsw_posix::{PosixRtos, TaskRunner};
//!
//! let adapter = Arc::new(AsyncAdapter::<_, 3>::new(PosixRtos::new(3), AsyncConfig::default()));
//! let runner = TaskRunner::start(Arc::clone(&adapter))?;
//! // ... schedule work ...
//! runner.shutdown()?;
//! # Ok::<(), bsw_posix::PortError>(())
//! ```

mod error;
mod rtos;
mod runner;
mod signal;

pub use error::{PortError, PortResult};
pub use rtos::{PosixRtos, DEFAULT_TICK_PERIOD_US};
pub use runner::{simulate_isr, TaskRunner};
pub use signal::PosixSignal;
