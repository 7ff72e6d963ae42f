//! Cooperative cancellation for retry runs.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable signal that asks in-flight runs to stop.
///
/// All clones share one flag. Once [`cancel`](Self::cancel) is called the flag
/// stays set; a token cannot be reset.
///
/// # Examples
///
/// ```rust
/// use retryable::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
///
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Cancel every run observing this token.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Wait until the token is cancelled.
    ///
    /// Resolves immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
