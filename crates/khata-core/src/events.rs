use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::EntityId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    InventoryItem,
    Invoice,
    Purchase,
    Proforma,
    Customer,
    Supplier,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InventoryItem => "inventory_item",
            Self::Invoice => "invoice",
            Self::Purchase => "purchase",
            Self::Proforma => "proforma",
            Self::Customer => "customer",
            Self::Supplier => "supplier",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelayEventKind {
    Created,
    Updated,
    Deleted,
    StockRefreshed,
}

/// A persisted mutation, rebroadcast so other sessions can patch their mirror.
///
/// `record` is the full record after the mutation (before it, for deletes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEvent {
    pub kind: RelayEventKind,
    pub entity: EntityKind,
    pub entity_id: EntityId,
    pub occurred_at: DateTime<Utc>,
    pub record: serde_json::Value,
}

impl RelayEvent {
    pub fn new<T: Serialize>(
        kind: RelayEventKind,
        entity: EntityKind,
        entity_id: EntityId,
        record: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            kind,
            entity,
            entity_id,
            occurred_at: Utc::now(),
            record: serde_json::to_value(record)?,
        })
    }

    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_snake_case() {
        let event = RelayEvent::new(
            RelayEventKind::StockRefreshed,
            EntityKind::InventoryItem,
            4,
            &serde_json::json!({ "id": 4 }),
        )
        .unwrap();
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["kind"], "stock_refreshed");
        assert_eq!(encoded["entity"], "inventory_item");
        assert_eq!(encoded["entity_id"], 4);
    }
}
