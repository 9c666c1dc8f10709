//! Tests for AsyncConfig builder and defaults.

use bsw_async::{AsyncConfig, MAX_ISR_NESTING};

#[test]
fn async_config_builder() {
    let config = AsyncConfig::builder()
        .name("Body")
        .wait_events_tick_count(250)
        .future_wait_ticks(4)
        .max_isr_nesting(3)
        .task_names(&["idle", "can", "diag"])
        .build();

    assert_eq!(config.name, "Body");
    assert_eq!(config.wait_events_tick_count, 250);
    assert_eq!(config.future_wait_ticks, 4);
    assert_eq!(config.max_isr_nesting, 3);
    assert_eq!(config.task_name(2), "diag");
}

#[test]
fn async_config_default() {
    let config = AsyncConfig::default();

    assert_eq!(config.name, "BSW");
    assert_eq!(config.wait_events_tick_count, 100);
    assert_eq!(config.future_wait_ticks, 10);
    assert_eq!(config.max_isr_nesting, MAX_ISR_NESTING);
    assert_eq!(config.task_name(0), "task");
}

#[test]
fn async_config_clamps_out_of_range_values() {
    let config = AsyncConfig::builder()
        .wait_events_tick_count(0)
        .future_wait_ticks(0)
        .max_isr_nesting(MAX_ISR_NESTING + 5)
        .build();

    assert_eq!(config.wait_events_tick_count, 1);
    assert_eq!(config.future_wait_ticks, 1);
    assert_eq!(config.max_isr_nesting, MAX_ISR_NESTING);
}
