//! Retry configuration.

use std::time::Duration;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default wait between a failed attempt and the next one.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

/// How many times to retry and how long to wait in between.
///
/// Options are plain data: they describe the retry behavior but never run
/// anything, so they are cheap to clone, compare and inspect.
///
/// The delay is fixed. There is no backoff and no jitter; every retry waits
/// exactly [`delay`](Self::delay).
///
/// # Examples
///
/// ```rust
/// use retryable::RetryOptions;
/// use std::time::Duration;
///
/// let options = RetryOptions::default();
/// assert_eq!(options.retries(), 3);
/// assert_eq!(options.delay(), Duration::from_millis(1000));
/// assert_eq!(options.max_attempts(), 4);
///
/// let options = RetryOptions::new()
///     .with_retries(2)
///     .with_delay(Duration::from_millis(100));
/// assert_eq!(options.max_attempts(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryOptions {
    retries: u32,
    delay: Duration,
}

impl RetryOptions {
    /// Options with the defaults: 3 retries, 1000ms apart.
    pub fn new() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_DELAY,
        }
    }

    /// Build options from signed values, clamping anything negative to zero.
    ///
    /// A negative `retries` means "no retries" and a negative `delay_ms`
    /// means "no wait".
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retryable::RetryOptions;
    /// use std::time::Duration;
    ///
    /// let options = RetryOptions::from_signed(-2, -50);
    /// assert_eq!(options.retries(), 0);
    /// assert_eq!(options.delay(), Duration::ZERO);
    /// ```
    pub fn from_signed(retries: i64, delay_ms: i64) -> Self {
        Self {
            retries: clamp_to_u32(retries),
            delay: Duration::from_millis(delay_ms.max(0) as u64),
        }
    }

    /// Set the number of retries after the first attempt.
    ///
    /// `with_retries(3)` allows up to 4 attempts in total. Attempts are
    /// counted in a `u32`, so `u32::MAX` retries still caps the run at
    /// `u32::MAX` attempts.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the wait between a failed attempt and the next one.
    ///
    /// A zero duration disables the wait entirely.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of retries after the first attempt.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Wait between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total number of attempts a run may make (first try plus retries).
    ///
    /// Saturates at `u32::MAX`: with `retries == u32::MAX` this is
    /// `u32::MAX`, one short of `retries + 1`.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// The wait before the attempt after `attempt`, or `None` if no attempt follows.
    ///
    /// `attempt` is 1-based. `Some(Duration::ZERO)` means the next attempt
    /// starts without waiting.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retryable::RetryOptions;
    /// use std::time::Duration;
    ///
    /// let options = RetryOptions::new()
    ///     .with_retries(2)
    ///     .with_delay(Duration::from_millis(50));
    ///
    /// assert_eq!(options.delay_after(1), Some(Duration::from_millis(50)));
    /// assert_eq!(options.delay_after(2), Some(Duration::from_millis(50)));
    /// assert_eq!(options.delay_after(3), None); // final attempt
    ///
    /// let immediate = options.with_delay(Duration::ZERO);
    /// assert_eq!(immediate.delay_after(1), Some(Duration::ZERO));
    /// ```
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts() {
            None
        } else {
            Some(self.delay)
        }
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
