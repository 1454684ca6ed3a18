use async_trait::async_trait;
use khata_core::{BillingResult, EntityId, Party, PartyDraft, PartyRole};
use khata_finance::{Bill, BillDraft, BillKind, PaymentLedger};
use khata_inventory::{InventoryDraft, InventoryItem, StockPlan};

/// A bill as stored, with the inventory rows its stock plan changed.
#[derive(Debug, Clone)]
pub struct CommittedBill {
    pub bill: Bill,
    pub stock: Vec<InventoryItem>,
}

/// CRUD collaborator that assigns identities and creation timestamps.
///
/// `update_*`, `save_ledger` and `delete_*` return `None` when the row does
/// not exist. Collaborator failures surface as `BillingError::Gateway` and
/// mean nothing was committed.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn list_inventory(&self) -> BillingResult<Vec<InventoryItem>>;
    async fn get_inventory(&self, id: EntityId) -> BillingResult<Option<InventoryItem>>;
    async fn insert_inventory(&self, draft: InventoryDraft) -> BillingResult<InventoryItem>;
    async fn update_inventory(&self, item: InventoryItem) -> BillingResult<Option<InventoryItem>>;
    async fn delete_inventory(&self, id: EntityId) -> BillingResult<Option<InventoryItem>>;

    async fn list_parties(&self, role: PartyRole) -> BillingResult<Vec<Party>>;
    async fn get_party(&self, role: PartyRole, id: EntityId) -> BillingResult<Option<Party>>;
    async fn insert_party(&self, role: PartyRole, draft: PartyDraft) -> BillingResult<Party>;
    async fn update_party(&self, role: PartyRole, party: Party) -> BillingResult<Option<Party>>;
    async fn delete_party(&self, role: PartyRole, id: EntityId) -> BillingResult<Option<Party>>;

    async fn list_bills(&self, kind: BillKind) -> BillingResult<Vec<Bill>>;
    async fn get_bill(&self, id: EntityId) -> BillingResult<Option<Bill>>;

    /// Stores the bill and applies `plan` as one unit. If any adjustment is
    /// rejected neither the bill nor any stock row changes.
    async fn commit_bill(&self, draft: BillDraft, plan: &StockPlan) -> BillingResult<CommittedBill>;

    async fn save_ledger(&self, bill_id: EntityId, ledger: PaymentLedger) -> BillingResult<Option<Bill>>;

    /// Administrative removal. Stock is left as it is.
    async fn delete_bill(&self, id: EntityId) -> BillingResult<Option<Bill>>;
}
