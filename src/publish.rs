//! Shared output plumbing for [`Debounced`](crate::Debounced) and [`Throttled`](crate::Throttled).

use futures::stream::{self, Stream};
use tokio::sync::watch;

/// Stream every value published after the call, ending when the publisher stops.
pub(crate) fn updates<T>(mut rx: watch::Receiver<T>) -> impl Stream<Item = T>
where
    T: Clone,
{
    rx.borrow_and_update();
    stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let value = rx.borrow_and_update().clone();
        Some((value, rx))
    })
}
