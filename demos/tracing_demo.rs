//! Demonstrates tracing output from retry runs
//!
//! Run with: cargo run --example tracing_demo

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use retryable::Retryable;

#[tokio::main]
async fn main() {
    // Set up tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    tracing::info!("Starting tracing demo");

    let calls = Arc::new(AtomicU32::new(0));
    let flaky = Retryable::new({
        let calls = calls.clone();
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(format!("connection reset ({})", n + 1))
                } else {
                    Ok("payload")
                }
            }
        }
    })
    .with_delay(Duration::from_millis(50));

    match flaky.run().await {
        Ok(success) => tracing::info!(attempts = success.attempts, "fetched {}", success.value),
        Err(e) => tracing::error!("fetch failed: {}", e),
    }

    let broken = Retryable::new(|| async { Err::<(), _>("service down") })
        .with_retries(2)
        .with_delay(Duration::from_millis(20));

    if let Err(e) = broken.run().await {
        tracing::error!("giving up: {}", e);
    }
}
