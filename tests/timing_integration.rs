//! Integration tests for timing behavior through the public API.
//!
//! Every test runs on a paused clock, so delays are exact and instant.

use futures::StreamExt;
use retryable::testing::FlakyOperation;
use retryable::{
    assert_attempts, assert_exhausted, CancelToken, Debounced, RetryOptions, Retryable, Throttled,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};

// ============================================================================
// Retry scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn always_failing_with_no_delay_makes_four_attempts() {
    let flaky = FlakyOperation::always_failing((), "E");
    let options = RetryOptions::new().with_retries(3).with_delay(Duration::ZERO);
    let retryable = Retryable::with_options(flaky.operation(), options);

    let start = Instant::now();
    let result = retryable.run().await;

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(flaky.calls(), 4);
    assert_attempts!(result, 4);
    assert_exhausted!(result, "E");
}

#[tokio::test(start_paused = true)]
async fn two_failures_then_success_waits_between_attempts() {
    let flaky = FlakyOperation::new(2, 42, "busy");
    let options = RetryOptions::new()
        .with_retries(2)
        .with_delay(Duration::from_millis(100));
    let retryable = Retryable::with_options(flaky.operation(), options);

    let start = Instant::now();
    let success = retryable.run().await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(flaky.calls(), 3);
    assert_eq!(success.into_value(), 42);
}

#[tokio::test(start_paused = true)]
async fn no_retries_and_immediate_success_resolves_at_once() {
    let flaky = FlakyOperation::new(0, "value", "unused");
    let options = RetryOptions::new()
        .with_retries(0)
        .with_delay(Duration::from_millis(1000));
    let retryable = Retryable::with_options(flaky.operation(), options);

    let start = Instant::now();
    let success = retryable.run().await.unwrap();

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(flaky.calls(), 1);
    assert_eq!(success.into_value(), "value");
}

#[tokio::test(start_paused = true)]
async fn one_retry_pauses_once_then_fails() {
    let flaky = FlakyOperation::always_failing((), "F");
    let options = RetryOptions::new()
        .with_retries(1)
        .with_delay(Duration::from_millis(50));
    let retryable = Retryable::with_options(flaky.operation(), options);

    let start = Instant::now();
    let result = retryable.run().await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(100));
    assert_eq!(flaky.calls(), 2);
    assert_exhausted!(result, "F");
}

#[tokio::test(start_paused = true)]
async fn negative_configuration_means_single_attempt_without_wait() {
    let flaky = FlakyOperation::always_failing((), "down");
    let retryable = Retryable::with_options(flaky.operation(), RetryOptions::from_signed(-5, -1));

    let start = Instant::now();
    let result = retryable.run().await;

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_attempts!(result, 1);
}

#[tokio::test(start_paused = true)]
async fn cancelling_stops_remaining_attempts() {
    let flaky = FlakyOperation::always_failing((), "down");
    let retryable = Retryable::new(flaky.operation()).with_delay(Duration::from_secs(1));
    let token = CancelToken::new();

    let canceller = {
        let token = token.clone();
        async move {
            sleep(Duration::from_millis(1500)).await;
            token.cancel();
        }
    };

    let (result, ()) = tokio::join!(retryable.run_until(&token), canceller);
    let err = result.unwrap_err();

    // Attempts at t=0 and t=1000; cancelled while waiting for t=2000.
    assert!(err.is_cancelled());
    assert_eq!(flaky.calls(), 2);
    assert_eq!(err.attempts(), 2);
    assert_eq!(err.into_error(), Some("down"));
}

// ============================================================================
// Debounce and throttle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn debounced_search_publishes_final_query() {
    let query = Debounced::new(String::new());
    let mut updates = Box::pin(query.updates());

    for partial in ["r", "re", "ret", "retry"] {
        query.set(partial.to_string());
        sleep(Duration::from_millis(100)).await;
    }

    let start = Instant::now();
    assert_eq!(updates.next().await.as_deref(), Some("retry"));
    // Last set was 100ms ago; the default quiet period is 300ms.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn throttled_scroll_position_is_rate_limited() {
    let position = Throttled::new(0u32);
    let mut rx = position.subscribe();
    let mut published = Vec::new();

    // One update every 20ms for one second.
    for offset in 1..=50u32 {
        position.set(offset * 10);
        sleep(Duration::from_millis(20)).await;
        if rx.has_changed().unwrap() {
            published.push(*rx.borrow_and_update());
        }
    }

    // 1000ms at the default 200ms limit.
    assert!(published.len() >= 4);
    assert!(published.len() <= 5);
    assert!(published.windows(2).all(|pair| pair[0] < pair[1]));
}
