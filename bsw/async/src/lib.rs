#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! # BSW Async
//!
//! Binds runnables, timeouts and futures to an underlying RTOS. A target
//! provides one [`Rtos`] implementation; [`AsyncAdapter`] turns it into the
//! [`Scheduler`] used by every higher component to run work now, later or
//! periodically, and [`FutureSupport`] lets a task wait for a signal raised
//! by another task or an interrupt.

pub mod adapter;
pub mod config;
pub mod executor;
pub mod future;
pub mod rtos;
pub mod scheduler;
pub mod task;
pub mod timeout;
pub mod timer;

pub use adapter::AsyncAdapter;
pub use config::{AsyncConfig, AsyncConfigBuilder};
pub use executor::RunnableExecutor;
pub use future::FutureSupport;
pub use rtos::*;
pub use scheduler::Scheduler;
pub use task::TaskContext;
pub use timeout::{Timeout, TimeoutMode, TimeoutState};
pub use timer::Timer;

pub use bsw_core::{
    AsyncError, AsyncResult, ContextHook, ContextId, ExecutionContext, Runnable, TimeUnit, Work,
    CONTEXT_INVALID, TASK_IDLE,
};
