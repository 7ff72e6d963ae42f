//! Retry Patterns Example
//!
//! Demonstrates the retry executor and its companions:
//! - Basic retry with a fixed delay
//! - Conditional retry (retry_if)
//! - Observing progress through hooks and a watch channel
//! - Cancellation
//! - Debounce and throttle for bursty values

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use retryable::prelude::*;
use retryable::RetryEvent;

// ==================== Basic Retry ====================

/// Example 1: retry an operation that fails transiently.
async fn example_basic_retry() {
    println!("\n=== Example 1: Basic Retry ===");

    let attempts = Arc::new(AtomicU32::new(0));

    let retryable = Retryable::new({
        let attempts = attempts.clone();
        move || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                println!("  Attempt {}", n + 1);
                if n < 2 {
                    Err("transient failure")
                } else {
                    Ok("success!")
                }
            }
        }
    })
    .with_retries(5)
    .with_delay(Duration::from_millis(100));

    match retryable.run().await {
        Ok(success) => println!(
            "Success after {} attempts ({:?}): {}",
            success.attempts, success.elapsed, success.value
        ),
        Err(err) => println!("Failed: {}", err),
    }
}

// ==================== Conditional Retry ====================

#[derive(Debug, Clone, PartialEq)]
enum ApiError {
    Timeout,
    NotFound,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Timeout => write!(f, "request timed out"),
            ApiError::NotFound => write!(f, "resource not found"),
        }
    }
}

/// Example 2: only retry errors that may go away on their own.
async fn example_retry_if() {
    println!("\n=== Example 2: Conditional Retry ===");

    let retryable = Retryable::new(|| async { Err::<(), _>(ApiError::NotFound) })
        .with_delay(Duration::from_millis(50))
        .retry_if(|err: &ApiError| matches!(err, ApiError::Timeout));

    match retryable.run().await {
        Ok(_) => println!("Unexpected success"),
        Err(err) => println!(
            "Stopped after {} attempt(s), rejected={}: {}",
            err.attempts(),
            err.is_rejected(),
            err
        ),
    }
}

// ==================== Observability ====================

/// Example 3: log every failure through a hook.
async fn example_hooks() {
    println!("\n=== Example 3: Retry Hooks ===");

    let retryable = Retryable::new(|| async { Err::<(), _>(ApiError::Timeout) })
        .with_retries(2)
        .with_delay(Duration::from_millis(20));

    let _ = retryable
        .run_with_hooks(|event: &RetryEvent<'_, ApiError>| {
            println!(
                "  attempt {} failed after {:?}: {} (next delay: {:?})",
                event.attempt, event.elapsed, event.error, event.next_delay
            );
        })
        .await;
}

/// Example 4: watch attempt count and last error from another task.
async fn example_observed() {
    println!("\n=== Example 4: Observed State ===");

    let (state, mut watcher) = RetryState::channel();
    let reporter = tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let seen = watcher.borrow_and_update().clone();
            println!("  state: attempt={} last_error={:?}", seen.attempt, seen.last_error);
        }
    });

    let attempts = Arc::new(AtomicU32::new(0));
    let retryable = Retryable::new({
        let attempts = attempts.clone();
        move || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if n == 0 {
                    Err("cold cache")
                } else {
                    Ok(n)
                }
            }
        }
    })
    .with_delay(Duration::from_millis(30));

    let result = retryable.run_observed(&state).await;
    drop(state);
    let _ = reporter.await;
    println!("Result: {:?}", result.map(|s| s.value));
}

// ==================== Cancellation ====================

/// Example 5: give up on a slow retry loop from the outside.
async fn example_cancellation() {
    println!("\n=== Example 5: Cancellation ===");

    let token = CancelToken::new();
    let retryable = Retryable::new(|| async { Err::<(), _>("unreachable host") })
        .with_retries(10)
        .with_delay(Duration::from_secs(1));

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            println!("  cancelling...");
            token.cancel();
        })
    };

    let result = retryable.run_until(&token).await;
    let _ = canceller.await;

    if let Err(err) = result {
        println!("{}", err);
    }
}

// ==================== Debounce and Throttle ====================

/// Example 6: collapse bursts of input.
async fn example_debounce_throttle() {
    println!("\n=== Example 6: Debounce and Throttle ===");

    let search = Debounced::with_delay(String::new(), Duration::from_millis(200));
    let scroll = Throttled::with_limit(0u32, Duration::from_millis(100));

    for (i, text) in ["s", "st", "sti", "stil", "still"].iter().enumerate() {
        search.set(text.to_string());
        scroll.set((i as u32 + 1) * 120);
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    println!("  debounced so far: {:?}", search.get());
    println!("  throttled so far: {}", scroll.get());

    tokio::time::sleep(Duration::from_millis(250)).await;
    println!("  debounced settled: {:?}", search.get());
    println!("  throttled settled: {}", scroll.get());
}

#[tokio::main]
async fn main() {
    println!("Retry Patterns Examples");
    println!("=======================");

    example_basic_retry().await;
    example_retry_if().await;
    example_hooks().await;
    example_observed().await;
    example_cancellation().await;
    example_debounce_throttle().await;

    println!("\n=== All examples completed successfully! ===");
}
