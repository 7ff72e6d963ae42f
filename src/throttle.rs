//! Throttled values.
//!
//! A [`Throttled`] publishes at most one value per limit window. A value set
//! after the window has passed is published immediately; values set inside the
//! window collapse into a single trailing publish at the end of the window,
//! carrying the latest of them.
//!
//! The window clock starts when the `Throttled` is created, so a value set
//! right after creation waits for the first window to close.

use std::fmt;
use std::time::Duration;

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};

use crate::publish;

/// Default minimum spacing between published values.
pub const DEFAULT_THROTTLE_LIMIT: Duration = Duration::from_millis(200);

/// A value published at most once per limit window.
///
/// Creating one spawns a task on the current tokio runtime. Dropping the
/// handle stops the task and discards any trailing value.
///
/// # Example
///
/// ```rust
/// use retryable::Throttled;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let position = Throttled::with_limit(0, Duration::from_millis(200));
///
/// tokio::time::sleep(Duration::from_millis(250)).await;
/// position.set(10); // window has passed: published right away
/// position.set(20); // inside the new window: trailing
/// position.set(30); // replaces 20
///
/// tokio::time::sleep(Duration::from_millis(10)).await;
/// assert_eq!(position.get(), 10);
///
/// tokio::time::sleep(Duration::from_millis(200)).await;
/// assert_eq!(position.get(), 30);
/// # }
/// ```
pub struct Throttled<T> {
    values: mpsc::UnboundedSender<(T, Instant)>,
    published: watch::Receiver<T>,
    limit: Duration,
}

impl<T> Throttled<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start with `initial` and the default 200ms limit.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(initial: T) -> Self {
        Self::with_limit(initial, DEFAULT_THROTTLE_LIMIT)
    }

    /// Start with `initial` and a custom limit.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn with_limit(initial: T, limit: Duration) -> Self {
        let (values, rx) = mpsc::unbounded_channel();
        let (publisher, published) = watch::channel(initial);
        tokio::spawn(throttle_loop(rx, publisher, limit, Instant::now()));
        Self {
            values,
            published,
            limit,
        }
    }

    /// Offer a new value.
    pub fn set(&self, value: T) {
        let _ = self.values.send((value, Instant::now()));
    }

    /// The most recently published value.
    pub fn get(&self) -> T {
        self.published.borrow().clone()
    }

    /// The minimum spacing between published values.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// A receiver that sees every published value.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.published.clone()
    }

    /// A stream of values published from now on.
    pub fn updates(&self) -> impl Stream<Item = T> {
        publish::updates(self.published.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Throttled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttled")
            .field("value", &*self.published.borrow())
            .field("limit", &self.limit)
            .finish()
    }
}

async fn throttle_loop<T>(
    mut values: mpsc::UnboundedReceiver<(T, Instant)>,
    publisher: watch::Sender<T>,
    limit: Duration,
    mut last_published: Instant,
) {
    let mut trailing: Option<(T, Instant)> = None;

    loop {
        let deadline = trailing.as_ref().map(|(_, at)| *at);

        tokio::select! {
            value = values.recv() => match value {
                Some((value, now)) => {
                    if now.saturating_duration_since(last_published) >= limit {
                        trailing = None;
                        last_published = now;
                        publisher.send_replace(value);
                    } else {
                        trailing = Some((value, last_published + limit));
                    }
                }
                None => break,
            },
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((value, _)) = trailing.take() {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(
                        limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        "publishing trailing value"
                    );
                    last_published = Instant::now();
                    publisher.send_replace(value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn test_defaults() {
        let throttled = Throttled::new("idle");
        assert_eq!(throttled.get(), "idle");
        assert_eq!(throttled.limit(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_after_window_publishes_immediately() {
        let throttled = Throttled::with_limit(0, Duration::from_millis(100));
        let mut rx = throttled.subscribe();

        time::sleep(Duration::from_millis(150)).await;
        let before = Instant::now();
        throttled.set(1);
        rx.changed().await.unwrap();

        assert_eq!(*rx.borrow(), 1);
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_inside_first_window_is_deferred() {
        let throttled = Throttled::with_limit(0, Duration::from_millis(100));

        time::sleep(Duration::from_millis(30)).await;
        throttled.set(1);
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(throttled.get(), 0);

        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(throttled.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_inside_window_collapse_to_latest() {
        let throttled = Throttled::with_limit(0, Duration::from_millis(100));
        let mut updates = Box::pin(throttled.updates());

        time::sleep(Duration::from_millis(100)).await;
        throttled.set(1);
        throttled.set(2);
        throttled.set(3);

        assert_eq!(updates.next().await, Some(1));
        assert_eq!(updates.next().await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_publish_restarts_window() {
        let throttled = Throttled::with_limit(0, Duration::from_millis(100));

        time::sleep(Duration::from_millis(10)).await;
        throttled.set(1); // trailing at t=100
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(throttled.get(), 1);

        // t=110: only 10ms since the trailing publish.
        throttled.set(2);
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(throttled.get(), 1);

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(throttled.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_stream_publishes_once_per_window() {
        let throttled = Throttled::with_limit(0u32, Duration::from_millis(100));
        let mut rx = throttled.subscribe();
        let mut published = Vec::new();

        for value in 1..=30u32 {
            throttled.set(value);
            time::sleep(Duration::from_millis(10)).await;
            if rx.has_changed().unwrap() {
                published.push(*rx.borrow_and_update());
            }
        }

        // 300ms of updates with a 100ms limit.
        assert!(published.len() <= 3);
        assert!(!published.is_empty());
        assert!(published.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_discards_trailing_value() {
        let throttled = Throttled::with_limit(0, Duration::from_millis(100));
        let updates = throttled.updates();

        throttled.set(1);
        drop(throttled);

        assert_eq!(updates.collect::<Vec<_>>().await, Vec::<i32>::new());
    }
}
