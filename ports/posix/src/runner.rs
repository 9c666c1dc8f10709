//! Task threads and simulated interrupts

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bsw_async::AsyncAdapter;
use bsw_core::{AsyncResult, ContextId};

use crate::error::{PortError, PortResult};
use crate::rtos::PosixRtos;

struct TaskThread {
    context: ContextId,
    name: &'static str,
    handle: JoinHandle<AsyncResult<()>>,
}

/// Runs the dispatch loop of every task context except idle on a thread
/// of its own.
///
/// The idle task stays with the caller, which is expected to drive it, for
/// example through `FutureSupport::wait` or `dispatch_while_work`.
pub struct TaskRunner<const TASKS: usize> {
    adapter: Arc<AsyncAdapter<PosixRtos, TASKS>>,
    threads: Vec<TaskThread>,
}

impl<const TASKS: usize> TaskRunner<TASKS> {
    pub fn start(adapter: Arc<AsyncAdapter<PosixRtos, TASKS>>) -> PortResult<Self> {
        let mut runner = Self {
            adapter,
            threads: Vec::with_capacity(TASKS.saturating_sub(1)),
        };
        for index in 1..TASKS {
            let context = ContextId::new(index as u8);
            let name = runner.adapter.task_name(context).unwrap_or("task");
            let adapter = Arc::clone(&runner.adapter);
            // Threads spawned so far are stopped by Drop if this fails
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn(move || {
                    PosixRtos::bind_current_task(context);
                    adapter.dispatch(context)
                })?;
            runner.threads.push(TaskThread {
                context,
                name,
                handle,
            });
        }
        log::info!(
            "{}: started {} task threads",
            runner.adapter.config().name,
            runner.threads.len()
        );
        Ok(runner)
    }

    pub fn adapter(&self) -> &Arc<AsyncAdapter<PosixRtos, TASKS>> {
        &self.adapter
    }

    /// Stop every dispatch loop and join the threads.
    ///
    /// Reports the first task that panicked or failed; all threads are
    /// joined regardless.
    pub fn shutdown(mut self) -> PortResult<()> {
        self.stop_all()
    }

    fn stop_all(&mut self) -> PortResult<()> {
        let threads = std::mem::take(&mut self.threads);
        let mut result = Ok(());
        for thread in &threads {
            if let Err(error) = self.adapter.stop_dispatch(thread.context) {
                log::error!("task {} could not be stopped: {}", thread.name, error);
                if result.is_ok() {
                    result = Err(PortError::from(error));
                }
            }
        }
        for thread in threads {
            let outcome = match thread.handle.join() {
                Ok(dispatched) => dispatched.map_err(PortError::from),
                Err(_) => Err(PortError::TaskPanicked(thread.name)),
            };
            if let Err(error) = outcome {
                log::error!("task {} ended abnormally: {}", thread.name, error);
                if result.is_ok() {
                    result = Err(error);
                }
            }
        }
        result
    }
}

impl<const TASKS: usize> Drop for TaskRunner<TASKS> {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            log::warn!("task runner dropped without shutdown");
            let _ = self.stop_all();
        }
    }
}

impl<const TASKS: usize> core::fmt::Debug for TaskRunner<TASKS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("threads", &self.threads.len())
            .finish()
    }
}

/// Run `isr` on the calling thread as ISR group `group`.
///
/// Mirrors the entry and exit code of a real interrupt vector: the context
/// hook sees the group, the scheduler treats posts as coming from an
/// interrupt and a requested yield is carried out on exit.
pub fn simulate_isr<T, const TASKS: usize>(
    adapter: &AsyncAdapter<PosixRtos, TASKS>,
    group: ContextId,
    isr: impl FnOnce() -> T,
) -> T {
    adapter.enter_isr(group);
    let output = isr();
    adapter.leave_isr(group);
    output
}
