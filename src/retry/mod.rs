//! Retry-with-delay for async operations.
//!
//! A [`Retryable`] binds a zero-argument async operation to a fixed retry
//! configuration:
//!
//! - **Bounded**: at most `retries + 1` attempts
//! - **Fixed delay**: every retry waits the same [`RetryOptions::delay`]; no backoff, no jitter
//! - **Last error wins**: a failed run reports only the final attempt's error
//!
//! # Quick Start
//!
//! ```rust
//! use retryable::{RetryOptions, Retryable};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let options = RetryOptions::new()
//!     .with_retries(3)
//!     .with_delay(Duration::from_millis(10));
//!
//! let retryable = Retryable::with_options(|| async { Ok::<_, String>(42) }, options);
//!
//! assert_eq!(retryable.run().await.unwrap().into_value(), 42);
//! # });
//! ```
//!
//! # Observing a run
//!
//! Progress is never stored on the `Retryable` itself. Each run reports it
//! through its own channel:
//!
//! - the returned [`Attempted`] / [`RetryError`] carry the attempt count
//! - [`Retryable::run_observed`] publishes a [`RetryState`] to a `watch` channel
//! - [`Retryable::run_with_hooks`] calls a hook with a [`RetryEvent`] after each failure
//!
//! # Cancellation
//!
//! [`Retryable::run_until`] takes a [`CancelToken`](crate::CancelToken) and
//! stops at the next suspension point once it fires.
//! [`Retryable::run_observed_until`] does the same while publishing state.

mod error;
mod executor;
mod options;
#[cfg(feature = "serde")]
mod serde_impl;

pub use error::{Attempted, RetryError};
pub use executor::{AlwaysRetry, RetryEvent, RetryPredicate, RetryState, Retryable};
pub use options::{RetryOptions, DEFAULT_DELAY, DEFAULT_RETRIES};
