//! Execution context identifiers

use core::fmt;

/// Identifier of a task or ISR group.
///
/// Ids are assigned once when the system is configured and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(u8);

impl ContextId {
    /// Create a context id
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw id
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Id usable as an array index
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check against the invalid sentinel
    pub const fn is_valid(self) -> bool {
        self.0 != CONTEXT_INVALID.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ContextId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.0);
    }
}

/// The idle (background) task. Always task 0.
pub const TASK_IDLE: ContextId = ContextId(0);

/// Sentinel for "no context", e.g. a timeout that was never armed.
pub const CONTEXT_INVALID: ContextId = ContextId(0xFF);

/// Id of the RTOS timer task for a system with `task_count` tasks.
pub const fn timer_task(task_count: usize) -> ContextId {
    ContextId(task_count as u8)
}

/// Kind of an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// RTOS task
    Task,
    /// Group of interrupt service routines sharing one priority
    IsrGroup,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ContextKind {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            ContextKind::Task => defmt::write!(fmt, "Task"),
            ContextKind::IsrGroup => defmt::write!(fmt, "IsrGroup"),
        }
    }
}

/// A scheduling domain: an id together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    id: ContextId,
    kind: ContextKind,
}

impl ExecutionContext {
    /// Task context with the given id
    pub const fn task(id: ContextId) -> Self {
        Self { id, kind: ContextKind::Task }
    }

    /// ISR group context with the given id
    pub const fn isr_group(id: ContextId) -> Self {
        Self { id, kind: ContextKind::IsrGroup }
    }

    pub const fn id(&self) -> ContextId {
        self.id
    }

    pub const fn kind(&self) -> ContextKind {
        self.kind
    }

    pub const fn is_task(&self) -> bool {
        matches!(self.kind, ContextKind::Task)
    }

    pub const fn is_isr(&self) -> bool {
        matches!(self.kind, ContextKind::IsrGroup)
    }

    /// True for the idle task
    pub const fn is_idle(&self) -> bool {
        self.is_task() && self.id.0 == TASK_IDLE.0
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ContextKind::Task => write!(f, "Task({})", self.id),
            ContextKind::IsrGroup => write!(f, "IsrGroup({})", self.id),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ExecutionContext {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}({})", self.kind, self.id);
    }
}

/// Create a task [`ContextId`] from a literal
#[macro_export]
macro_rules! context {
    ($value:literal) => {
        $crate::ContextId::new($value)
    };
}
