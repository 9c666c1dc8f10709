//! The scheduling interface used by higher components

use bsw_core::{AsyncResult, ContextId, ExecutionContext, Runnable, TimeUnit};

use crate::timeout::Timeout;

/// Run work now, later or periodically in a given context.
///
/// All methods except [`Scheduler::cancel`] may be called from any task or
/// interrupt and never block.
pub trait Scheduler {
    /// Dispatch `runnable` in `context` as soon as that context runs.
    ///
    /// Runnables posted to the same context run in FIFO order. Posting a
    /// runnable that is still pending does not queue it a second time.
    fn execute(&self, context: ContextId, runnable: &'static dyn Runnable) -> AsyncResult<()>;

    /// Run `runnable` once in `context` after `delay`.
    fn schedule(
        &self,
        context: ContextId,
        runnable: &'static dyn Runnable,
        timeout: &'static Timeout,
        delay: u32,
        unit: TimeUnit,
    ) -> AsyncResult<()>;

    /// Run `runnable` in `context` every `period` until canceled.
    fn schedule_at_fixed_rate(
        &self,
        context: ContextId,
        runnable: &'static dyn Runnable,
        timeout: &'static Timeout,
        period: u32,
        unit: TimeUnit,
    ) -> AsyncResult<()>;

    /// Disarm `timeout`.
    ///
    /// Must be called from the context the timeout was armed for. Canceling
    /// an idle, expired or already canceled timeout does nothing. Once this
    /// returns the timeout's runnable is not started again by it, though an
    /// invocation already running is not interrupted.
    fn cancel(&self, timeout: &Timeout);

    /// The context the caller is running in
    fn current_context(&self) -> ExecutionContext;
}
