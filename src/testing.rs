//! Testing utilities for code built on [`Retryable`](crate::Retryable).
//!
//! This module provides a scripted operation that fails a set number of times
//! before succeeding, assertion macros for run outcomes, and property-based
//! testing support.
//!
//! # Examples
//!
//! ```rust
//! use retryable::testing::FlakyOperation;
//! use retryable::{assert_attempts, Retryable};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let flaky = FlakyOperation::new(2, "ok", "timeout");
//! let retryable = Retryable::new(flaky.operation()).with_delay(Duration::ZERO);
//!
//! let result = retryable.run().await;
//! assert_attempts!(result, 3);
//! assert_eq!(flaky.calls(), 3);
//! # });
//! ```

use std::future::{ready, Ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// An operation that fails a fixed number of times, then succeeds forever.
///
/// Clones share the call counter, so a test can hand
/// [`operation`](Self::operation) to a `Retryable` and still inspect
/// [`calls`](Self::calls) afterwards.
///
/// # Example
///
/// ```rust
/// use retryable::testing::FlakyOperation;
///
/// # tokio_test::block_on(async {
/// let flaky = FlakyOperation::new(1, 42, "busy");
///
/// assert_eq!(flaky.call().await, Err("busy"));
/// assert_eq!(flaky.call().await, Ok(42));
/// assert_eq!(flaky.calls(), 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FlakyOperation<T, E> {
    calls: Arc<AtomicU32>,
    failures: u32,
    value: T,
    error: E,
}

impl<T: Clone, E: Clone> FlakyOperation<T, E> {
    /// Fail the first `failures` calls with `error`, then return `value`.
    pub fn new(failures: u32, value: T, error: E) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            failures,
            value,
            error,
        }
    }

    /// An operation that never succeeds.
    pub fn always_failing(value: T, error: E) -> Self {
        Self::new(u32::MAX, value, error)
    }

    /// Invoke the operation once.
    pub fn call(&self) -> Ready<Result<T, E>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            ready(Err(self.error.clone()))
        } else {
            ready(Ok(self.value.clone()))
        }
    }

    /// A zero-argument closure suitable for [`Retryable::new`](crate::Retryable::new).
    pub fn operation(&self) -> impl Fn() -> Ready<Result<T, E>> {
        let this = self.clone();
        move || this.call()
    }

    /// Number of times the operation has been invoked across all clones.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Assert how many attempts a run made, whether it succeeded or not.
///
/// # Example
///
/// ```rust
/// use retryable::{assert_attempts, Attempted};
/// use std::time::Duration;
///
/// let result: Result<_, retryable::RetryError<String>> =
///     Ok(Attempted::new(1, 2, Duration::ZERO));
/// assert_attempts!(result, 2);
/// ```
#[macro_export]
macro_rules! assert_attempts {
    ($result:expr, $expected:expr) => {
        match &$result {
            Ok(success) => {
                assert_eq!(
                    success.attempts, $expected,
                    "Expected {} attempts, successful run made {}",
                    $expected, success.attempts
                );
            }
            Err(error) => {
                let attempts = $crate::RetryError::attempts(error);
                assert_eq!(
                    attempts, $expected,
                    "Expected {} attempts, failed run made {}",
                    $expected, attempts
                );
            }
        }
    };
}

/// Assert that a run exhausted its attempts, optionally with a specific final error.
///
/// # Example
///
/// ```rust
/// use retryable::{assert_exhausted, RetryError};
/// use std::time::Duration;
///
/// let result: Result<retryable::Attempted<()>, _> =
///     Err(RetryError::exhausted("down", 4, Duration::ZERO));
/// assert_exhausted!(result);
///
/// let result: Result<retryable::Attempted<()>, _> =
///     Err(RetryError::exhausted("down", 4, Duration::ZERO));
/// assert_exhausted!(result, "down");
/// ```
#[macro_export]
macro_rules! assert_exhausted {
    ($result:expr) => {
        match $result {
            Err($crate::RetryError::Exhausted { .. }) => {}
            other => panic!("Expected exhausted retries, got {:?}", other),
        }
    };
    ($result:expr, $error:expr) => {
        match $result {
            Err($crate::RetryError::Exhausted { final_error, .. }) => {
                assert_eq!(final_error, $error);
            }
            other => panic!(
                "Expected exhausted retries with {:?}, got {:?}",
                $error, other
            ),
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl Arbitrary for crate::RetryOptions {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (0u32..=16, 0u64..=2_000)
            .prop_map(|(retries, delay_ms)| {
                crate::RetryOptions::new()
                    .with_retries(retries)
                    .with_delay(std::time::Duration::from_millis(delay_ms))
            })
            .boxed()
    }
}
