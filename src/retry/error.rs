//! Result envelopes for retry runs.

use std::fmt;
use std::time::Duration;

/// A successful run, together with how long it took to get there.
///
/// # Examples
///
/// ```rust
/// use retryable::Retryable;
///
/// # tokio_test::block_on(async {
/// let retryable = Retryable::new(|| async { Ok::<_, String>(42) });
///
/// let success = retryable.run().await.unwrap();
/// assert_eq!(success.attempts, 1);
/// assert_eq!(success.into_value(), 42);
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    /// The value produced by the successful attempt.
    pub value: T,
    /// Total number of attempts made, including the successful one.
    pub attempts: u32,
    /// Time from the start of the run to the successful attempt's completion.
    pub elapsed: Duration,
}

impl<T> Attempted<T> {
    /// Create a new success envelope.
    pub fn new(value: T, attempts: u32, elapsed: Duration) -> Self {
        Self {
            value,
            attempts,
            elapsed,
        }
    }

    /// Extract the value, discarding metadata.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// True when the first attempt succeeded.
    pub fn first_try(&self) -> bool {
        self.attempts == 1
    }
}

/// Error returned when a run does not produce a value.
///
/// Only the error from the most recent attempt is kept. Errors from earlier
/// attempts are never aggregated.
///
/// # Examples
///
/// ```rust
/// use retryable::{RetryError, Retryable};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let retryable = Retryable::new(|| async { Err::<(), _>("always fails") })
///     .with_retries(2)
///     .with_delay(Duration::ZERO);
///
/// match retryable.run().await {
///     Err(RetryError::Exhausted { final_error, attempts, .. }) => {
///         assert_eq!(final_error, "always fails");
///         assert_eq!(attempts, 3); // 1 initial + 2 retries
///     }
///     other => panic!("Expected exhaustion, got {:?}", other),
/// }
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every allowed attempt failed.
    Exhausted {
        /// The error from the final attempt.
        final_error: E,
        /// Total number of attempts made.
        attempts: u32,
        /// Total time spent on the run.
        elapsed: Duration,
    },
    /// The retry predicate declined to retry a failure.
    Rejected {
        /// The error that was not retried.
        error: E,
        /// Total number of attempts made.
        attempts: u32,
        /// Total time spent on the run.
        elapsed: Duration,
    },
    /// The run was cancelled before it settled.
    Cancelled {
        /// The error from the most recent failed attempt, if any attempt failed.
        last_error: Option<E>,
        /// Number of attempts started before cancellation.
        attempts: u32,
        /// Total time spent on the run.
        elapsed: Duration,
    },
}

impl<E> RetryError<E> {
    /// Create an exhaustion error.
    pub fn exhausted(final_error: E, attempts: u32, elapsed: Duration) -> Self {
        Self::Exhausted {
            final_error,
            attempts,
            elapsed,
        }
    }

    /// Create a rejection error.
    pub fn rejected(error: E, attempts: u32, elapsed: Duration) -> Self {
        Self::Rejected {
            error,
            attempts,
            elapsed,
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(last_error: Option<E>, attempts: u32, elapsed: Duration) -> Self {
        Self::Cancelled {
            last_error,
            attempts,
            elapsed,
        }
    }

    /// Number of attempts made before the run ended.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Time spent on the run.
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Exhausted { elapsed, .. }
            | Self::Rejected { elapsed, .. }
            | Self::Cancelled { elapsed, .. } => *elapsed,
        }
    }

    /// The most recent error from the operation, if there was one.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { final_error, .. } => Some(final_error),
            Self::Rejected { error, .. } => Some(error),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Extract the most recent error from the operation, discarding metadata.
    ///
    /// Returns `None` only for a run cancelled before any attempt failed.
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Exhausted { final_error, .. } => Some(final_error),
            Self::Rejected { error, .. } => Some(error),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }

    /// Returns true if every allowed attempt failed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns true if the retry predicate stopped the run.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns true if the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Transform the operation error, keeping the metadata.
    pub fn map_err<E2>(self, f: impl FnOnce(E) -> E2) -> RetryError<E2> {
        match self {
            Self::Exhausted {
                final_error,
                attempts,
                elapsed,
            } => RetryError::Exhausted {
                final_error: f(final_error),
                attempts,
                elapsed,
            },
            Self::Rejected {
                error,
                attempts,
                elapsed,
            } => RetryError::Rejected {
                error: f(error),
                attempts,
                elapsed,
            },
            Self::Cancelled {
                last_error,
                attempts,
                elapsed,
            } => RetryError::Cancelled {
                last_error: last_error.map(f),
                attempts,
                elapsed,
            },
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                final_error,
                attempts,
                elapsed,
            } => write!(
                f,
                "retry exhausted after {} attempts ({:?}): {}",
                attempts, elapsed, final_error
            ),
            Self::Rejected {
                error, attempts, ..
            } => write!(
                f,
                "error not retryable after {} attempts: {}",
                attempts, error
            ),
            Self::Cancelled {
                last_error: Some(error),
                attempts,
                ..
            } => write!(
                f,
                "retry cancelled after {} attempts: {}",
                attempts, error
            ),
            Self::Cancelled {
                last_error: None,
                attempts,
                ..
            } => write!(f, "retry cancelled after {} attempts", attempts),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_error()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
