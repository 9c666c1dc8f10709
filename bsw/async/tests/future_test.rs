//! Cross-context future tests against the fake RTOS

mod common;

use std::sync::atomic::Ordering;

use bsw_async::{AsyncAdapter, AsyncConfig, FutureSupport, Scheduler};
use bsw_core::{context, ContextId, Work, TASK_IDLE};

use common::{leak, FakeRtos};

const WAITER: ContextId = context!(1);
const NOTIFIER: ContextId = context!(2);
const CAN_RX_ISR: ContextId = context!(0);

type Adapter = AsyncAdapter<FakeRtos, 3>;

fn adapter_with(config: AsyncConfig) -> &'static Adapter {
    leak(AsyncAdapter::new(FakeRtos::new(), config))
}

fn adapter() -> &'static Adapter {
    adapter_with(AsyncConfig::default())
}

#[test]
fn isr_notify_before_wait_is_not_missed() {
    let adapter = adapter();
    let future = FutureSupport::new(adapter, WAITER);

    adapter.enter_isr(CAN_RX_ISR);
    future.notify();
    adapter.leave_isr(CAN_RX_ISR);

    adapter.rtos().switch_to(WAITER);
    future.wait();
    assert_eq!(*adapter.rtos().signals.waits.lock().expect("signal lock"), vec![10]);
}

#[test]
fn isr_notify_requests_yield_when_higher_priority_task_released() {
    let adapter = adapter();
    let rtos = adapter.rtos();
    rtos.signals.wakes_higher.store(true, Ordering::SeqCst);
    let future = FutureSupport::new(adapter, WAITER);

    adapter.enter_isr(CAN_RX_ISR);
    future.notify();
    assert!(adapter.leave_isr(CAN_RX_ISR));
    assert_eq!(rtos.yields.load(Ordering::SeqCst), 1);
}

#[test]
fn task_notify_does_not_request_yield() {
    let adapter = adapter();
    let rtos = adapter.rtos();
    rtos.signals.wakes_higher.store(true, Ordering::SeqCst);
    let future = FutureSupport::new(adapter, WAITER);

    rtos.switch_to(NOTIFIER);
    future.notify();
    assert!(future.try_wait().is_ok());
    assert_eq!(rtos.yields.load(Ordering::SeqCst), 0);
}

#[test]
fn task_wait_retries_with_bounded_ticks() {
    let config = AsyncConfig::builder().future_wait_ticks(7).build();
    let adapter = adapter_with(config);
    let rtos = adapter.rtos();
    rtos.signals.release_after.store(3, Ordering::SeqCst);
    let future = FutureSupport::new(adapter, WAITER);

    rtos.switch_to(WAITER);
    future.wait();
    assert_eq!(*rtos.signals.waits.lock().expect("signal lock"), vec![7, 7, 7]);
}

#[test]
fn idle_wait_polls_and_runs_background_work() {
    let adapter = adapter();
    let future: &'static FutureSupport<'static, FakeRtos, 3> =
        leak(FutureSupport::new(adapter, TASK_IDLE));
    let notifier = leak(Work::new(move || future.notify()));

    adapter.execute(TASK_IDLE, notifier).expect("execute");
    future.wait();
    assert_eq!(*adapter.rtos().signals.waits.lock().expect("signal lock"), vec![0, 0]);
}

#[test]
fn notifications_collapse() {
    let adapter = adapter();
    let future = FutureSupport::new(adapter, WAITER);
    future.notify();
    future.notify();
    assert!(future.try_wait().is_ok());
    assert!(matches!(future.try_wait(), Err(nb::Error::WouldBlock)));
}

#[test]
fn task_context_checks() {
    let adapter = adapter();
    let future = FutureSupport::new(adapter, WAITER);
    assert_eq!(future.context(), WAITER);

    adapter.rtos().switch_to(NOTIFIER);
    assert!(!future.verify_task_context());

    adapter.rtos().switch_to(WAITER);
    assert!(future.verify_task_context());
    future.assert_task_context();

    adapter.enter_isr(CAN_RX_ISR);
    assert!(!future.verify_task_context());
    adapter.leave_isr(CAN_RX_ISR);
    assert_eq!(adapter.current_context().id(), WAITER);
}

#[test]
#[should_panic(expected = "context affinity violated")]
fn assert_task_context_panics_in_foreign_task() {
    let adapter = adapter();
    let future = FutureSupport::new(adapter, WAITER);
    adapter.rtos().switch_to(NOTIFIER);
    future.assert_task_context();
}

#[test]
#[should_panic(expected = "called from an ISR")]
fn wait_from_isr_panics() {
    let adapter = adapter();
    let future = FutureSupport::new(adapter, WAITER);
    future.notify();
    adapter.enter_isr(CAN_RX_ISR);
    future.wait();
}
