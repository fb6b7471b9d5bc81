use tokio::sync::broadcast;
use tracing::debug;

use shared::ChangeEvent;

/// Event channel capacity. A lagging subscriber misses events and should
/// re-query rather than replay.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Broadcast feed of document changes. Every successful mutation publishes
/// one event; subscribers (the WebSocket endpoint, an embedding process)
/// re-run their queries on receipt. Dropping a receiver simply ceases
/// interest.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publish a change. A send with no live subscribers is not an error;
    /// the store is still the source of truth.
    pub fn publish(&self, event: ChangeEvent) {
        debug!(?event, "publishing change event");
        let _ = self.tx.send(event);
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Collection;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        let event = ChangeEvent {
            collection: Collection::Entries,
            user_id: Some("user::abc".to_string()),
            date: Some("2024-03-15".to_string()),
        };
        feed.publish(event.clone());

        let received = rx.recv().await.expect("receive");
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let feed = ChangeFeed::new();
        feed.publish(ChangeEvent {
            collection: Collection::Profiles,
            user_id: None,
            date: None,
        });
    }
}
