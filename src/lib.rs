//! # Retryable
//!
//! Small async building blocks for application code that talks to unreliable
//! things:
//!
//! - [`Retryable`]: run an async operation up to `retries + 1` times with a
//!   fixed delay in between, surfacing only the last error
//! - [`Debounced`]: publish a value once updates have stopped for a quiet period
//! - [`Throttled`]: publish a value at most once per limit window
//!
//! ## Quick Example
//!
//! ```rust
//! use retryable::{RetryError, Retryable};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let retryable = Retryable::new(|| async { Err::<u32, _>("service unavailable") })
//!     .with_retries(2)
//!     .with_delay(Duration::from_millis(1));
//!
//! match retryable.run().await {
//!     Ok(success) => println!("got {} after {} attempts", success.value, success.attempts),
//!     Err(RetryError::Exhausted { final_error, attempts, .. }) => {
//!         assert_eq!(final_error, "service unavailable");
//!         assert_eq!(attempts, 3);
//!     }
//!     Err(other) => panic!("unexpected: {}", other),
//! }
//! # });
//! ```
//!
//! ## Features
//!
//! - `tracing` (default): spans and events for every run
//! - `serde`: `Serialize`/`Deserialize` for [`RetryOptions`]
//! - `proptest`: `Arbitrary` for [`RetryOptions`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cancel;
pub mod debounce;
mod publish;
pub mod retry;
pub mod testing;
pub mod throttle;

// Re-exports
pub use cancel::CancelToken;
pub use debounce::Debounced;
pub use retry::{
    AlwaysRetry, Attempted, RetryError, RetryEvent, RetryOptions, RetryPredicate, RetryState,
    Retryable,
};
pub use throttle::Throttled;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::debounce::Debounced;
    pub use crate::retry::{Attempted, RetryError, RetryOptions, RetryState, Retryable};
    pub use crate::throttle::Throttled;
}
