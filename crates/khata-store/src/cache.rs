use anyhow::Context;
use khata_core::{BillingResult, EntityId, EntityKind, Party, PartyRole, RelayEvent, RelayEventKind};
use khata_finance::{Bill, BillKind};
use khata_inventory::InventoryItem;
use rust_decimal::Decimal;
use tracing::debug;

use crate::gateway::PersistenceGateway;

trait Identified {
    fn id(&self) -> EntityId;
}

impl Identified for InventoryItem {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Identified for Bill {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Identified for Party {
    fn id(&self) -> EntityId {
        self.id
    }
}

fn upsert<T: Identified>(rows: &mut Vec<T>, record: T) {
    match rows.iter_mut().find(|row| row.id() == record.id()) {
        Some(slot) => *slot = record,
        None => rows.push(record),
    }
}

fn remove<T: Identified>(rows: &mut Vec<T>, id: EntityId) {
    rows.retain(|row| row.id() != id);
}

/// One session's copy of every entity list.
///
/// Filled from the gateway on load and then kept current by relay events.
/// A session that missed events stays stale until `reload`.
#[derive(Debug, Clone, Default)]
pub struct ClientStore {
    inventory: Vec<InventoryItem>,
    invoices: Vec<Bill>,
    purchases: Vec<Bill>,
    proformas: Vec<Bill>,
    customers: Vec<Party>,
    suppliers: Vec<Party>,
}

impl ClientStore {
    pub async fn load(gateway: &dyn PersistenceGateway) -> BillingResult<Self> {
        let mut store = Self::default();
        store.reload(gateway).await?;
        Ok(store)
    }

    pub async fn reload(&mut self, gateway: &dyn PersistenceGateway) -> BillingResult<()> {
        self.inventory = gateway.list_inventory().await?;
        self.invoices = gateway.list_bills(BillKind::Invoice).await?;
        self.purchases = gateway.list_bills(BillKind::Purchase).await?;
        self.proformas = gateway.list_bills(BillKind::Proforma).await?;
        self.customers = gateway.list_parties(PartyRole::Customer).await?;
        self.suppliers = gateway.list_parties(PartyRole::Supplier).await?;
        Ok(())
    }

    /// Patches the matching list by identity.
    pub fn apply(&mut self, event: &RelayEvent) -> anyhow::Result<()> {
        debug!(
            "applying {:?} for {} {}",
            event.kind, event.entity, event.entity_id
        );

        match event.entity {
            EntityKind::InventoryItem => patch(&mut self.inventory, event),
            EntityKind::Invoice => patch(&mut self.invoices, event),
            EntityKind::Purchase => patch(&mut self.purchases, event),
            EntityKind::Proforma => patch(&mut self.proformas, event),
            EntityKind::Customer => patch(&mut self.customers, event),
            EntityKind::Supplier => patch(&mut self.suppliers, event),
        }
    }

    pub fn inventory(&self) -> &[InventoryItem] {
        &self.inventory
    }

    pub fn bills(&self, kind: BillKind) -> &[Bill] {
        match kind {
            BillKind::Invoice => &self.invoices,
            BillKind::Purchase => &self.purchases,
            BillKind::Proforma => &self.proformas,
        }
    }

    pub fn parties(&self, role: PartyRole) -> &[Party] {
        match role {
            PartyRole::Customer => &self.customers,
            PartyRole::Supplier => &self.suppliers,
        }
    }

    pub fn find_inventory(&self, id: EntityId) -> Option<&InventoryItem> {
        self.inventory.iter().find(|item| item.id == id)
    }

    pub fn find_bill(&self, kind: BillKind, id: EntityId) -> Option<&Bill> {
        self.bills(kind).iter().find(|bill| bill.id == id)
    }

    /// Unpaid balance across invoices (receivable) or purchases (payable).
    pub fn outstanding(&self, kind: BillKind) -> Decimal {
        self.bills(kind)
            .iter()
            .filter_map(|bill| bill.ledger.as_ref())
            .map(|ledger| ledger.amount_pending())
            .sum()
    }

    pub fn low_stock(&self, threshold: Decimal) -> Vec<&InventoryItem> {
        self.inventory
            .iter()
            .filter(|item| item.quantity_on_hand <= threshold)
            .collect()
    }
}

fn patch<T>(rows: &mut Vec<T>, event: &RelayEvent) -> anyhow::Result<()>
where
    T: Identified + for<'de> serde::Deserialize<'de>,
{
    match event.kind {
        RelayEventKind::Deleted => remove(rows, event.entity_id),
        RelayEventKind::Created | RelayEventKind::Updated | RelayEventKind::StockRefreshed => {
            let record: T = event
                .decode()
                .with_context(|| format!("malformed {} record {}", event.entity, event.entity_id))?;
            upsert(rows, record);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use khata_core::PartyDraft;
    use khata_finance::{BillBuilder, Jurisdiction, LineItem, PaymentRequest};
    use rust_decimal_macros::dec;

    use super::*;

    fn item(id: EntityId, on_hand: Decimal) -> InventoryItem {
        InventoryItem {
            id,
            name: format!("item-{id}"),
            hsn_code: None,
            unit_price: dec!(10),
            tax_rate: dec!(5),
            quantity_on_hand: on_hand,
            average_cost: dec!(8),
            created_at: Utc::now(),
        }
    }

    fn event<T: serde::Serialize>(
        kind: RelayEventKind,
        entity: EntityKind,
        id: EntityId,
        record: &T,
    ) -> RelayEvent {
        RelayEvent::new(kind, entity, id, record).unwrap()
    }

    #[test]
    fn events_patch_by_identity() {
        let mut store = ClientStore::default();
        store
            .apply(&event(RelayEventKind::Created, EntityKind::InventoryItem, 1, &item(1, dec!(10))))
            .unwrap();
        store
            .apply(&event(RelayEventKind::Created, EntityKind::InventoryItem, 2, &item(2, dec!(4))))
            .unwrap();
        store
            .apply(&event(
                RelayEventKind::StockRefreshed,
                EntityKind::InventoryItem,
                1,
                &item(1, dec!(7)),
            ))
            .unwrap();

        assert_eq!(store.inventory().len(), 2);
        assert_eq!(store.find_inventory(1).unwrap().quantity_on_hand, dec!(7));
        assert_eq!(store.low_stock(dec!(5)).len(), 1);

        store
            .apply(&event(RelayEventKind::Deleted, EntityKind::InventoryItem, 2, &item(2, dec!(4))))
            .unwrap();
        assert!(store.find_inventory(2).is_none());
    }

    #[test]
    fn update_for_unseen_record_is_inserted() {
        let mut store = ClientStore::default();
        let party = PartyDraft::named("Gupta Hardware").into_party(3, Utc::now());
        store
            .apply(&event(RelayEventKind::Updated, EntityKind::Supplier, 3, &party))
            .unwrap();
        assert_eq!(store.parties(PartyRole::Supplier), &[party]);
        assert!(store.parties(PartyRole::Customer).is_empty());
    }

    #[test]
    fn outstanding_sums_pending_balances() {
        let draft = BillBuilder::new(BillKind::Invoice, 1, Jurisdiction::Same)
            .with_items([LineItem::new(1, dec!(10), dec!(100), dec!(18))])
            .build()
            .unwrap();
        let mut bill = Bill::from_draft(draft, 1, Utc::now());
        bill.record_payment(&PaymentRequest::new(dec!(500))).unwrap();

        let mut store = ClientStore::default();
        store
            .apply(&event(RelayEventKind::Updated, EntityKind::Invoice, 1, &bill))
            .unwrap();

        assert_eq!(store.outstanding(BillKind::Invoice), dec!(680));
        assert_eq!(store.outstanding(BillKind::Purchase), Decimal::ZERO);
    }

    #[test]
    fn malformed_record_is_reported() {
        let mut store = ClientStore::default();
        let bogus = event(
            RelayEventKind::Created,
            EntityKind::Customer,
            1,
            &serde_json::json!({ "unexpected": true }),
        );
        let err = store.apply(&bogus).unwrap_err();
        assert!(err.to_string().contains("malformed customer record 1"));
    }

    #[test]
    fn overflowing_bill_is_reported_not_mirrored() {
        let mut store = ClientStore::default();
        let oversized = event(
            RelayEventKind::Created,
            EntityKind::Invoice,
            4,
            &serde_json::json!({
                "id": 4,
                "kind": "invoice",
                "counterparty_id": 1,
                "items": [
                    {
                        "product_id": 1,
                        "quantity": "79228162514264337593543950335",
                        "unit_price": "2",
                        "tax_rate": "18"
                    }
                ],
                "created_at": "2026-02-11T08:30:00Z"
            }),
        );

        let err = store.apply(&oversized).unwrap_err();
        assert!(format!("{err:#}").contains("out of range"));
        assert!(store.bills(BillKind::Invoice).is_empty());
    }

    #[tokio::test]
    async fn load_mirrors_the_gateway() {
        let gateway = crate::InMemoryGateway::new();
        gateway
            .insert_party(PartyRole::Customer, PartyDraft::named("Walk-in"))
            .await
            .unwrap();

        let store = ClientStore::load(&gateway).await.unwrap();
        assert_eq!(store.parties(PartyRole::Customer).len(), 1);
    }
}
