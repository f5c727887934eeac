use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of domain events to live subscribers. Publishing never blocks and
/// never fails: with no subscribers the event is dropped, and a subscriber
/// that falls behind sees `Lagged` and loses the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WsMessage>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, msg: WsMessage) {
        let kind = msg.kind();
        match self.tx.send(msg) {
            Ok(receivers) => tracing::debug!(event = kind, receivers, "Event published"),
            Err(_) => tracing::trace!(event = kind, "No subscribers, event dropped"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
