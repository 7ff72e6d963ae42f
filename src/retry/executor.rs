//! The retry loop.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::error::{Attempted, RetryError};
use super::options::RetryOptions;
use crate::cancel::CancelToken;

/// Decides whether a failed attempt should be retried.
///
/// Any `Fn(&E) -> bool` is a predicate. The predicate is consulted after
/// every failed attempt except the last one.
pub trait RetryPredicate<E> {
    /// Returns true if the failure should be retried.
    fn should_retry(&self, error: &E) -> bool;
}

/// The default predicate: every failure is retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysRetry;

impl<E> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

impl<E, F> RetryPredicate<E> for F
where
    F: Fn(&E) -> bool,
{
    fn should_retry(&self, error: &E) -> bool {
        self(error)
    }
}

/// Information about a failed attempt, passed to hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Wait before the next attempt, or `None` if no attempt follows.
    ///
    /// `Some(Duration::ZERO)` means the next attempt starts without waiting.
    /// Matches [`RetryOptions::delay_after`] unless the predicate rejected
    /// the error.
    pub next_delay: Option<Duration>,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

/// Observable progress of a single run.
///
/// `attempt` is 0 before the first attempt and is bumped before each attempt
/// starts. `last_error` holds the error from the most recent failure and is
/// cleared when an attempt succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState<E> {
    /// Number of attempts started so far.
    pub attempt: u32,
    /// Error from the most recent failed attempt.
    pub last_error: Option<E>,
}

impl<E> RetryState<E> {
    /// State before any attempt.
    pub fn new() -> Self {
        Self {
            attempt: 0,
            last_error: None,
        }
    }

    /// A watch channel seeded with the initial state, for [`Retryable::run_observed`].
    pub fn channel() -> (watch::Sender<Self>, watch::Receiver<Self>) {
        watch::channel(Self::new())
    }
}

impl<E> Default for RetryState<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// An async operation bound to a retry configuration.
///
/// The operation is a zero-argument factory: every attempt calls it again to
/// get a fresh future. Attempts run strictly one after another, separated by
/// the configured delay.
///
/// `run` and its variants take `&self` and keep all per-run state local, so
/// several runs of the same `Retryable` may be in flight at once without
/// interfering with each other.
///
/// # Example
///
/// ```rust
/// use retryable::Retryable;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let calls = AtomicU32::new(0);
/// let calls = &calls;
/// let retryable = Retryable::new(move || async move {
///     if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///         Err("not yet")
///     } else {
///         Ok(42)
///     }
/// })
/// .with_retries(3)
/// .with_delay(Duration::from_millis(1));
///
/// let success = retryable.run().await.unwrap();
/// assert_eq!(success.attempts, 3);
/// assert_eq!(success.into_value(), 42);
/// # });
/// ```
pub struct Retryable<F, P = AlwaysRetry> {
    operation: F,
    options: RetryOptions,
    predicate: P,
}

impl<F> Retryable<F> {
    /// Bind an operation with the default options (3 retries, 1000ms apart).
    pub fn new(operation: F) -> Self {
        Self::with_options(operation, RetryOptions::default())
    }

    /// Bind an operation with explicit options.
    pub fn with_options(operation: F, options: RetryOptions) -> Self {
        Self {
            operation,
            options,
            predicate: AlwaysRetry,
        }
    }
}

impl<F, P> Retryable<F, P> {
    /// Set the number of retries after the first attempt.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.options = self.options.with_retries(retries);
        self
    }

    /// Set the wait between attempts. Zero disables the wait.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.options = self.options.with_delay(delay);
        self
    }

    /// The options this operation runs with.
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Only retry failures for which `should_retry` returns true.
    ///
    /// Any other failure ends the run immediately with
    /// [`RetryError::Rejected`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use retryable::Retryable;
    /// use std::time::Duration;
    ///
    /// #[derive(Debug, PartialEq)]
    /// enum AppError { Transient, Permanent }
    ///
    /// # tokio_test::block_on(async {
    /// let retryable = Retryable::new(|| async { Err::<(), _>(AppError::Permanent) })
    ///     .with_delay(Duration::ZERO)
    ///     .retry_if(|err: &AppError| matches!(err, AppError::Transient));
    ///
    /// let err = retryable.run().await.unwrap_err();
    /// assert!(err.is_rejected());
    /// assert_eq!(err.attempts(), 1);
    /// # });
    /// ```
    pub fn retry_if<Q, T, E, Fut>(self, should_retry: Q) -> Retryable<F, Q>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Q: Fn(&E) -> bool,
    {
        self.with_predicate(should_retry)
    }

    /// Replace the retry predicate with any [`RetryPredicate`] implementation.
    pub fn with_predicate<Q>(self, predicate: Q) -> Retryable<F, Q> {
        Retryable {
            operation: self.operation,
            options: self.options,
            predicate,
        }
    }

    /// Run the operation until it succeeds or the attempts run out.
    ///
    /// On failure only the error from the final attempt is returned.
    pub async fn run<T, E, Fut>(&self) -> Result<Attempted<T>, RetryError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: RetryPredicate<E>,
    {
        self.execute(None, &mut Quiet).await
    }

    /// Run the operation, stopping early when `cancel` fires.
    ///
    /// The token is checked before each attempt and raced against both the
    /// pending operation and the wait between attempts. A cancelled run ends
    /// with [`RetryError::Cancelled`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use retryable::{CancelToken, Retryable};
    ///
    /// # tokio_test::block_on(async {
    /// let token = CancelToken::new();
    /// token.cancel();
    ///
    /// let retryable = Retryable::new(|| async { Ok::<_, String>(1) });
    /// let err = retryable.run_until(&token).await.unwrap_err();
    /// assert!(err.is_cancelled());
    /// assert_eq!(err.attempts(), 0);
    /// # });
    /// ```
    pub async fn run_until<T, E, Fut>(
        &self,
        cancel: &CancelToken,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: RetryPredicate<E>,
    {
        self.execute(Some(cancel), &mut Quiet).await
    }

    /// Run the operation, calling `on_failure` after every failed attempt.
    ///
    /// The hook is synchronous and should not block; use it for logging or
    /// metrics. [`RetryEvent::next_delay`] is `None` when no attempt follows.
    pub async fn run_with_hooks<T, E, Fut, H>(
        &self,
        on_failure: H,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: RetryPredicate<E>,
        H: FnMut(&RetryEvent<'_, E>),
    {
        self.execute(None, &mut Hooks(on_failure)).await
    }

    /// Run the operation, publishing progress to `state`.
    ///
    /// The state is reset when the run starts, then updated before every
    /// attempt and after every failure or success.
    ///
    /// # Example
    ///
    /// ```rust
    /// use retryable::{RetryState, Retryable};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let (state, watcher) = RetryState::channel();
    /// let retryable = Retryable::new(|| async { Err::<(), _>("down") })
    ///     .with_retries(1)
    ///     .with_delay(Duration::ZERO);
    ///
    /// let _ = retryable.run_observed(&state).await;
    /// let seen = watcher.borrow().clone();
    /// assert_eq!(seen.attempt, 2);
    /// assert_eq!(seen.last_error, Some("down"));
    /// # });
    /// ```
    pub async fn run_observed<T, E, Fut>(
        &self,
        state: &watch::Sender<RetryState<E>>,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: RetryPredicate<E>,
        E: Clone,
    {
        state.send_replace(RetryState::new());
        self.execute(None, &mut Publish(state)).await
    }

    /// Run the operation, publishing progress to `state` and stopping early
    /// when `cancel` fires.
    ///
    /// Combines [`run_observed`](Self::run_observed) and
    /// [`run_until`](Self::run_until). A cancelled run leaves `state` at the
    /// last attempt started and the last error seen.
    ///
    /// # Example
    ///
    /// ```rust
    /// use retryable::{CancelToken, RetryState, Retryable};
    ///
    /// # tokio_test::block_on(async {
    /// let (state, watcher) = RetryState::channel();
    /// let token = CancelToken::new();
    /// token.cancel();
    ///
    /// let retryable = Retryable::new(|| async { Err::<(), _>("down") });
    /// let err = retryable.run_observed_until(&state, &token).await.unwrap_err();
    /// assert!(err.is_cancelled());
    /// assert_eq!(watcher.borrow().attempt, 0);
    /// # });
    /// ```
    pub async fn run_observed_until<T, E, Fut>(
        &self,
        state: &watch::Sender<RetryState<E>>,
        cancel: &CancelToken,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: RetryPredicate<E>,
        E: Clone,
    {
        state.send_replace(RetryState::new());
        self.execute(Some(cancel), &mut Publish(state)).await
    }

    async fn execute<T, E, Fut, O>(
        &self,
        cancel: Option<&CancelToken>,
        observer: &mut O,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: RetryPredicate<E>,
        O: Observer<E>,
    {
        #[cfg(feature = "tracing")]
        let attempts = {
            use tracing::Instrument as _;
            let span = tracing::debug_span!(
                "retryable",
                retries = self.options.retries(),
                delay_ms = u64::try_from(self.options.delay().as_millis()).unwrap_or(u64::MAX)
            );
            self.attempt_loop(cancel, observer).instrument(span)
        };
        #[cfg(not(feature = "tracing"))]
        let attempts = self.attempt_loop(cancel, observer);

        attempts.await
    }

    async fn attempt_loop<T, E, Fut, O>(
        &self,
        cancel: Option<&CancelToken>,
        observer: &mut O,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: RetryPredicate<E>,
        O: Observer<E>,
    {
        let start = Instant::now();
        let max_attempts = self.options.max_attempts();
        let mut last_error: Option<E> = None;
        let mut attempt = 0u32;

        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(cancelled(last_error, attempt, start));
            }

            attempt += 1;
            observer.attempt_started(attempt);
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, max_attempts, "starting attempt");

            let outcome = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    outcome = (self.operation)() => Some(outcome),
                },
                None => Some((self.operation)().await),
            };

            let error = match outcome {
                Some(Ok(value)) => {
                    observer.succeeded(attempt);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, "attempt succeeded");
                    return Ok(Attempted::new(value, attempt, start.elapsed()));
                }
                Some(Err(error)) => error,
                None => return Err(cancelled(last_error, attempt, start)),
            };

            let is_final = attempt >= max_attempts;
            let retrying = !is_final && self.predicate.should_retry(&error);
            let next_delay = self.options.delay_after(attempt).filter(|_| retrying);
            observer.attempt_failed(&RetryEvent {
                attempt,
                error: &error,
                next_delay,
                elapsed: start.elapsed(),
            });

            if is_final {
                #[cfg(feature = "tracing")]
                tracing::error!(attempts = attempt, "retry attempts exhausted");
                return Err(RetryError::exhausted(error, attempt, start.elapsed()));
            }
            if !retrying {
                #[cfg(feature = "tracing")]
                tracing::info!(attempt, "failure rejected by retry predicate");
                return Err(RetryError::rejected(error, attempt, start.elapsed()));
            }

            #[cfg(feature = "tracing")]
            tracing::warn!(
                attempt,
                delay_ms = u64::try_from(self.options.delay().as_millis()).unwrap_or(u64::MAX),
                "attempt failed, retrying"
            );
            last_error = Some(error);

            if let Some(wait) = next_delay.filter(|wait| !wait.is_zero()) {
                let waited = match cancel {
                    Some(token) => tokio::select! {
                        biased;
                        _ = token.cancelled() => false,
                        _ = tokio::time::sleep(wait) => true,
                    },
                    None => {
                        tokio::time::sleep(wait).await;
                        true
                    }
                };
                if !waited {
                    return Err(cancelled(last_error, attempt, start));
                }
            }
        }
    }
}

impl<F, P> fmt::Debug for Retryable<F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retryable")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn cancelled<E>(last_error: Option<E>, attempts: u32, start: Instant) -> RetryError<E> {
    #[cfg(feature = "tracing")]
    tracing::info!(attempts, "retry cancelled");
    RetryError::cancelled(last_error, attempts, start.elapsed())
}

/// Receives progress from the attempt loop.
trait Observer<E> {
    fn attempt_started(&mut self, _attempt: u32) {}

    fn attempt_failed(&mut self, _event: &RetryEvent<'_, E>) {}

    fn succeeded(&mut self, _attempts: u32) {}
}

struct Quiet;

impl<E> Observer<E> for Quiet {}

struct Hooks<H>(H);

impl<E, H> Observer<E> for Hooks<H>
where
    H: FnMut(&RetryEvent<'_, E>),
{
    fn attempt_failed(&mut self, event: &RetryEvent<'_, E>) {
        (self.0)(event)
    }
}

struct Publish<'a, E>(&'a watch::Sender<RetryState<E>>);

impl<E: Clone> Observer<E> for Publish<'_, E> {
    fn attempt_started(&mut self, attempt: u32) {
        self.0.send_modify(|state| state.attempt = attempt);
    }

    fn attempt_failed(&mut self, event: &RetryEvent<'_, E>) {
        self.0
            .send_modify(|state| state.last_error = Some(event.error.clone()));
    }

    fn succeeded(&mut self, _attempts: u32) {
        self.0.send_modify(|state| state.last_error = None);
    }
}

#[cfg(all(test, feature = "tracing"))]
mod tracing_tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_exhaustion_is_logged() {
        let retryable = Retryable::new(|| async { Err::<(), _>("down") })
            .with_retries(1)
            .with_delay(Duration::ZERO);

        let _ = retryable.run().await;

        assert!(logs_contain("attempt failed, retrying"));
        assert!(logs_contain("retry attempts exhausted"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_success_is_logged() {
        let retryable = Retryable::new(|| async { Ok::<_, String>(1) });

        let _ = retryable.run().await;

        assert!(logs_contain("attempt succeeded"));
        assert!(!logs_contain("retry attempts exhausted"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_span_saturates_oversized_delay() {
        let retryable = Retryable::new(|| async { Err::<(), _>("down") })
            .with_retries(0)
            .with_delay(Duration::MAX);

        let _ = retryable.run().await;

        assert!(logs_contain("delay_ms=18446744073709551615"));
    }
}
