// ── Reactive streams ──
//
// Subscription handles and stream adapters shared by the monitors.

mod distinct;

use futures_core::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

pub use distinct::distinct_until_changed;

/// A subscription to one watch slot of the store.
///
/// Provides both point-in-time access and reactive change notification
/// via [`changed()`](Self::changed) or by converting to a `Stream`.
#[derive(Debug)]
pub struct Watched<T: Clone + Send + Sync + 'static> {
    current: T,
    receiver: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Watched<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<T>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The value captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The latest value, which may have changed since creation.
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change and return the new value.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        self.current = value.clone();
        Some(value)
    }

    /// Convert into a `Stream` that yields the latest value first, then
    /// every change.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static {
        WatchStream::new(self.receiver)
    }
}

/// Every value a store slot takes from subscription onwards.
///
/// Unlike [`Watched`], intermediate values are not collapsed: each change
/// is delivered in the order the reducer applied it. A subscriber that
/// falls too far behind loses the oldest changes but still ends on the
/// latest value.
#[derive(Debug)]
pub struct Transitions<T: Clone + Send + 'static> {
    current: T,
    changes: broadcast::Receiver<T>,
}

impl<T: Clone + Send + 'static> Transitions<T> {
    pub(crate) fn new(current: T, changes: broadcast::Receiver<T>) -> Self {
        Self { current, changes }
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    /// Yields the value at subscription time, then every change.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static {
        let Self {
            current,
            mut changes,
        } = self;
        async_stream::stream! {
            yield current;
            loop {
                match changes.recv().await {
                    Ok(value) => yield value,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "transition subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}
