use async_trait::async_trait;
use khata_core::{LiveRelay, RelayEvent};
use tokio::sync::broadcast;

/// Enough to absorb a burst of saves while a session is re-rendering.
const BROADCAST_CAPACITY: usize = 256;

/// In-process fan-out to every subscribed session.
#[derive(Clone)]
pub struct BroadcastRelay {
    tx: broadcast::Sender<RelayEvent>,
}

impl BroadcastRelay {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.tx.subscribe()
    }

    pub fn session_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LiveRelay for BroadcastRelay {
    async fn publish(&self, event: &RelayEvent) -> anyhow::Result<()> {
        // No subscribers is not an error; nobody needs patching.
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use khata_core::{EntityKind, RelayEventKind};

    use super::*;

    #[tokio::test]
    async fn every_session_sees_the_event() {
        let relay = BroadcastRelay::new();
        let mut first = relay.subscribe();
        let mut second = relay.subscribe();
        assert_eq!(relay.session_count(), 2);

        let event = RelayEvent::new(
            RelayEventKind::Deleted,
            EntityKind::Customer,
            5,
            &serde_json::json!({ "id": 5 }),
        )
        .unwrap();
        relay.publish(&event).await.unwrap();

        assert_eq!(first.recv().await.unwrap().entity_id, 5);
        assert_eq!(second.recv().await.unwrap().kind, RelayEventKind::Deleted);
    }

    #[tokio::test]
    async fn publishing_without_sessions_succeeds() {
        let relay = BroadcastRelay::new();
        let event = RelayEvent::new(
            RelayEventKind::Created,
            EntityKind::Supplier,
            1,
            &serde_json::json!({}),
        )
        .unwrap();
        assert!(relay.publish(&event).await.is_ok());
    }
}
