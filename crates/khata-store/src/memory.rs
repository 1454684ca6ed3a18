use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use khata_core::{BillingResult, EntityId, Party, PartyDraft, PartyRole};
use khata_finance::{Bill, BillDraft, BillKind, PaymentLedger};
use khata_inventory::{InventoryDraft, InventoryItem, StockPlan};
use tokio::sync::RwLock;

use crate::gateway::{CommittedBill, PersistenceGateway};

struct Table<T> {
    rows: BTreeMap<EntityId, T>,
    sequence: EntityId,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            sequence: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> EntityId {
        self.sequence += 1;
        self.sequence
    }
}

#[derive(Default)]
struct Tables {
    inventory: Table<InventoryItem>,
    customers: Table<Party>,
    suppliers: Table<Party>,
    bills: Table<Bill>,
}

impl Tables {
    fn parties(&self, role: PartyRole) -> &Table<Party> {
        match role {
            PartyRole::Customer => &self.customers,
            PartyRole::Supplier => &self.suppliers,
        }
    }

    fn parties_mut(&mut self, role: PartyRole) -> &mut Table<Party> {
        match role {
            PartyRole::Customer => &mut self.customers,
            PartyRole::Supplier => &mut self.suppliers,
        }
    }
}

/// Process-local gateway. Each table keeps its own id sequence; one lock
/// guards all tables so a bill and its stock movements commit together.
#[derive(Default)]
pub struct InMemoryGateway {
    tables: RwLock<Tables>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn list_inventory(&self) -> BillingResult<Vec<InventoryItem>> {
        let tables = self.tables.read().await;
        Ok(tables.inventory.rows.values().cloned().collect())
    }

    async fn get_inventory(&self, id: EntityId) -> BillingResult<Option<InventoryItem>> {
        let tables = self.tables.read().await;
        Ok(tables.inventory.rows.get(&id).cloned())
    }

    async fn insert_inventory(&self, draft: InventoryDraft) -> BillingResult<InventoryItem> {
        let mut tables = self.tables.write().await;
        let id = tables.inventory.next_id();
        let item = draft.into_item(id, Utc::now());
        tables.inventory.rows.insert(id, item.clone());
        Ok(item)
    }

    async fn update_inventory(&self, item: InventoryItem) -> BillingResult<Option<InventoryItem>> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.inventory.rows.get_mut(&item.id) else {
            return Ok(None);
        };
        *slot = InventoryItem {
            created_at: slot.created_at,
            ..item
        };
        Ok(Some(slot.clone()))
    }

    async fn delete_inventory(&self, id: EntityId) -> BillingResult<Option<InventoryItem>> {
        let mut tables = self.tables.write().await;
        Ok(tables.inventory.rows.remove(&id))
    }

    async fn list_parties(&self, role: PartyRole) -> BillingResult<Vec<Party>> {
        let tables = self.tables.read().await;
        Ok(tables.parties(role).rows.values().cloned().collect())
    }

    async fn get_party(&self, role: PartyRole, id: EntityId) -> BillingResult<Option<Party>> {
        let tables = self.tables.read().await;
        Ok(tables.parties(role).rows.get(&id).cloned())
    }

    async fn insert_party(&self, role: PartyRole, draft: PartyDraft) -> BillingResult<Party> {
        let mut tables = self.tables.write().await;
        let table = tables.parties_mut(role);
        let id = table.next_id();
        let party = draft.into_party(id, Utc::now());
        table.rows.insert(id, party.clone());
        Ok(party)
    }

    async fn update_party(&self, role: PartyRole, party: Party) -> BillingResult<Option<Party>> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.parties_mut(role).rows.get_mut(&party.id) else {
            return Ok(None);
        };
        *slot = Party {
            created_at: slot.created_at,
            ..party
        };
        Ok(Some(slot.clone()))
    }

    async fn delete_party(&self, role: PartyRole, id: EntityId) -> BillingResult<Option<Party>> {
        let mut tables = self.tables.write().await;
        Ok(tables.parties_mut(role).rows.remove(&id))
    }

    async fn list_bills(&self, kind: BillKind) -> BillingResult<Vec<Bill>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bills
            .rows
            .values()
            .filter(|bill| bill.kind == kind)
            .cloned()
            .collect())
    }

    async fn get_bill(&self, id: EntityId) -> BillingResult<Option<Bill>> {
        let tables = self.tables.read().await;
        Ok(tables.bills.rows.get(&id).cloned())
    }

    async fn commit_bill(&self, draft: BillDraft, plan: &StockPlan) -> BillingResult<CommittedBill> {
        let mut tables = self.tables.write().await;

        // Stock goes first: `apply` validates the whole plan before touching
        // a row, so an error here leaves every table as it was.
        let stock = plan.apply(&mut tables.inventory.rows)?;

        let id = tables.bills.next_id();
        let bill = Bill::from_draft(draft, id, Utc::now());
        tables.bills.rows.insert(id, bill.clone());

        Ok(CommittedBill { bill, stock })
    }

    async fn save_ledger(&self, bill_id: EntityId, ledger: PaymentLedger) -> BillingResult<Option<Bill>> {
        let mut tables = self.tables.write().await;
        let Some(bill) = tables.bills.rows.get_mut(&bill_id) else {
            return Ok(None);
        };
        bill.ledger = Some(ledger);
        Ok(Some(bill.clone()))
    }

    async fn delete_bill(&self, id: EntityId) -> BillingResult<Option<Bill>> {
        let mut tables = self.tables.write().await;
        Ok(tables.bills.rows.remove(&id))
    }
}
