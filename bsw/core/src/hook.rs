//! Context entry/exit hook

use crate::context::ContextId;

/// Observer called around every context invocation.
///
/// The dispatch trampoline calls `enter_*` right before a task or ISR group
/// starts running and `leave_*` right after it returns. Implementations run
/// inside those contexts, including interrupts, and must not block.
pub trait ContextHook: Sync {
    fn enter_task(&self, _task: ContextId) {}

    fn leave_task(&self, _task: ContextId) {}

    fn enter_isr_group(&self, _group: ContextId) {}

    fn leave_isr_group(&self, _group: ContextId) {}
}

/// Hook that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHook;

impl ContextHook for NoHook {}
