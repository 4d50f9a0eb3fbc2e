// ── Site snapshot subscriptions ──

use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Site;

type Snapshot = Arc<Vec<Arc<Site>>>;

/// A subscription to the store's sites.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed`](Self::changed) or by converting into a `Stream`.
pub struct SiteStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl SiteStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation time (or at the last `changed`).
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Latest snapshot, which may be newer than [`current`](Self::current).
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> WatchStream<Snapshot> {
        WatchStream::new(self.receiver)
    }
}
