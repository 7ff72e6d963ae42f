//! Debounced values.
//!
//! A [`Debounced`] holds a published value and accepts new candidate values
//! through [`set`](Debounced::set). A candidate is published only once no
//! newer candidate has arrived for the configured delay, so a burst of
//! updates publishes just its last value.
//!
//! ```rust
//! use retryable::Debounced;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let search = Debounced::with_delay(String::new(), Duration::from_millis(300));
//!
//! search.set("r".to_string());
//! search.set("ru".to_string());
//! search.set("rust".to_string());
//!
//! tokio::time::sleep(Duration::from_millis(350)).await;
//! assert_eq!(search.get(), "rust");
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};

use crate::publish;

/// Default quiet period before a value is published.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

enum Command<T> {
    Set { value: T, at: Instant },
    Cancel,
}

/// A value that settles only after updates stop for a quiet period.
///
/// Creating one spawns a task on the current tokio runtime. Dropping the
/// handle stops the task and discards any value still waiting to publish.
pub struct Debounced<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    published: watch::Receiver<T>,
    delay: Duration,
}

impl<T> Debounced<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start with `initial` and the default 300ms delay.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(initial: T) -> Self {
        Self::with_delay(initial, DEFAULT_DEBOUNCE_DELAY)
    }

    /// Start with `initial` and a custom quiet period.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn with_delay(initial: T, delay: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (publisher, published) = watch::channel(initial);
        tokio::spawn(debounce_loop(rx, publisher, delay));
        Self {
            commands,
            published,
            delay,
        }
    }

    /// Offer a new value, restarting the quiet period.
    pub fn set(&self, value: T) {
        // Only fails once the loop has exited, which needs `self` dropped.
        let _ = self.commands.send(Command::Set {
            value,
            at: Instant::now(),
        });
    }

    /// Drop the value waiting to publish, if any.
    ///
    /// The currently published value is left untouched.
    pub fn cancel(&self) {
        let _ = self.commands.send(Command::Cancel);
    }

    /// The most recently published value.
    pub fn get(&self) -> T {
        self.published.borrow().clone()
    }

    /// The quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
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

impl<T: fmt::Debug> fmt::Debug for Debounced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounced")
            .field("value", &*self.published.borrow())
            .field("delay", &self.delay)
            .finish()
    }
}

async fn debounce_loop<T>(
    mut commands: mpsc::UnboundedReceiver<Command<T>>,
    publisher: watch::Sender<T>,
    delay: Duration,
) {
    let mut pending: Option<(T, Instant)> = None;

    loop {
        let deadline = pending.as_ref().map(|(_, at)| *at);

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Set { value, at }) => pending = Some((value, at + delay)),
                Some(Command::Cancel) => pending = None,
                None => break,
            },
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((value, _)) = pending.take() {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "publishing debounced value"
                    );
                    publisher.send_replace(value);
                }
            }
        }
    }
}
