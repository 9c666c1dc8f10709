#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! # BSW Core
//!
//! Foundation types for the asynchronous execution layer of the basic
//! software stack: execution contexts, the runnable capability, intrusive
//! work queues, the system time base and the context hook seam used for
//! runtime statistics.

use core::fmt;

pub mod context;
pub mod hook;
pub mod queue;
pub mod runnable;
pub mod time;

pub use context::*;
pub use hook::*;
pub use queue::*;
pub use runnable::*;
pub use time::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used by the scheduling layer
pub type AsyncResult<T> = Result<T, AsyncError>;

/// Recoverable errors reported by the scheduling layer.
///
/// Contract violations (wrong calling context, queue capacity misuse) are not
/// represented here; they abort through an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncError {
    /// The target context is not configured
    UnknownContext(ContextId),
    /// The timeout is already armed
    AlreadyScheduled,
    /// Interrupt nesting exceeded the configured depth
    IsrNestingOverflow,
    /// A delay or period does not fit the timer range once converted to
    /// microseconds
    DelayOutOfRange,
}

impl fmt::Display for AsyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncError::UnknownContext(ctx) => write!(f, "Unknown execution context {}", ctx),
            AsyncError::AlreadyScheduled => write!(f, "Timeout is already scheduled"),
            AsyncError::IsrNestingOverflow => write!(f, "Interrupt nesting depth exceeded"),
            AsyncError::DelayOutOfRange => write!(f, "Delay exceeds the timer range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AsyncError {}

#[cfg(feature = "defmt")]
impl defmt::Format for AsyncError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            AsyncError::UnknownContext(ctx) => defmt::write!(fmt, "UnknownContext({})", ctx),
            AsyncError::AlreadyScheduled => defmt::write!(fmt, "AlreadyScheduled"),
            AsyncError::IsrNestingOverflow => defmt::write!(fmt, "IsrNestingOverflow"),
            AsyncError::DelayOutOfRange => defmt::write!(fmt, "DelayOutOfRange"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", AsyncError::UnknownContext(ContextId::new(7))),
            "Unknown execution context 7"
        );
        assert_eq!(format!("{}", AsyncError::AlreadyScheduled), "Timeout is already scheduled");
        assert_eq!(format!("{}", AsyncError::DelayOutOfRange), "Delay exceeds the timer range");
    }
}
