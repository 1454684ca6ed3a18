use async_trait::async_trait;

use crate::events::RelayEvent;

/// Rebroadcasts persisted mutations to other open sessions.
///
/// Delivery is best effort. Callers log a failed publish and carry on; the
/// write it describes has already been committed.
#[async_trait]
pub trait LiveRelay: Send + Sync {
    async fn publish(&self, event: &RelayEvent) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRelay;

#[async_trait]
impl LiveRelay for NoopRelay {
    async fn publish(&self, _event: &RelayEvent) -> anyhow::Result<()> {
        Ok(())
    }
}
