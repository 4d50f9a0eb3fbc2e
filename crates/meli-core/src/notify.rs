// ── Change notifier ──

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::EventPublishError;
use crate::model::SiteEvent;

const EVENT_CHANNEL_SIZE: usize = 256;

/// Fire-and-forget publisher of domain events.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: SiteEvent) -> Result<(), EventPublishError>;
}

/// In-process event bus on a `broadcast` channel.
///
/// Slow subscribers lag and drop old events; publishers never block.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Arc<SiteEvent>>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SiteEvent>> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, event: SiteEvent) -> Result<(), EventPublishError> {
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(Arc::new(event));
        Ok(())
    }
}
