use khata_core::{
    BillingError, BillingResult, EntityId, EntityKind, LiveRelay, Party, PartyDraft, PartyRole,
    RelayEvent, RelayEventKind,
};
use khata_finance::{Bill, BillBuilder, BillKind, PaymentOutcome, PaymentRequest};
use khata_inventory::{InventoryDraft, InventoryItem, StockPlan};
use khata_store::PersistenceGateway;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub bill: Bill,
    pub outcome: PaymentOutcome,
}

/// Runs every user-facing billing flow: validate locally, persist through the
/// gateway, then tell other sessions about it.
///
/// A failed relay publish is logged and otherwise ignored; the write is
/// already committed and sessions that miss it catch up on reload.
pub struct BillingService<G, R>
where
    G: PersistenceGateway,
    R: LiveRelay,
{
    gateway: G,
    relay: R,
}

impl<G, R> BillingService<G, R>
where
    G: PersistenceGateway,
    R: LiveRelay,
{
    pub fn new(gateway: G, relay: R) -> Self {
        Self { gateway, relay }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn create_party(&self, role: PartyRole, draft: PartyDraft) -> BillingResult<Party> {
        let draft = draft.normalize()?;
        let party = self.gateway.insert_party(role, draft).await?;

        info!("{} {} created", role.entity_kind(), party.id);
        self.announce(RelayEventKind::Created, role.entity_kind(), party.id, &party)
            .await;
        Ok(party)
    }

    pub async fn update_party(&self, role: PartyRole, party: Party) -> BillingResult<Party> {
        let id = party.id;
        let draft = PartyDraft {
            name: party.name,
            phone: party.phone,
            gstin: party.gstin,
            state: party.state,
            address: party.address,
        }
        .normalize()?;

        let updated = self
            .gateway
            .update_party(role, draft.into_party(id, party.created_at))
            .await?
            .ok_or_else(|| BillingError::not_found(role.entity_kind(), id))?;

        self.announce(RelayEventKind::Updated, role.entity_kind(), id, &updated)
            .await;
        Ok(updated)
    }

    pub async fn delete_party(&self, role: PartyRole, id: EntityId) -> BillingResult<Party> {
        let removed = self
            .gateway
            .delete_party(role, id)
            .await?
            .ok_or_else(|| BillingError::not_found(role.entity_kind(), id))?;

        info!("{} {} deleted", role.entity_kind(), id);
        self.announce(RelayEventKind::Deleted, role.entity_kind(), id, &removed)
            .await;
        Ok(removed)
    }

    pub async fn create_item(&self, draft: InventoryDraft) -> BillingResult<InventoryItem> {
        let draft = draft.normalize()?;
        let item = self.gateway.insert_inventory(draft).await?;

        info!("inventory item {} created with {} on hand", item.id, item.quantity_on_hand);
        self.announce(RelayEventKind::Created, EntityKind::InventoryItem, item.id, &item)
            .await;
        Ok(item)
    }

    pub async fn update_item(&self, item: InventoryItem) -> BillingResult<InventoryItem> {
        let id = item.id;
        let draft = InventoryDraft {
            name: item.name,
            hsn_code: item.hsn_code,
            unit_price: item.unit_price,
            tax_rate: item.tax_rate,
            quantity_on_hand: item.quantity_on_hand,
            average_cost: Some(item.average_cost),
        }
        .normalize()?;

        let updated = self
            .gateway
            .update_inventory(draft.into_item(id, item.created_at))
            .await?
            .ok_or_else(|| BillingError::not_found(EntityKind::InventoryItem, id))?;

        self.announce(RelayEventKind::Updated, EntityKind::InventoryItem, id, &updated)
            .await;
        Ok(updated)
    }

    pub async fn delete_item(&self, id: EntityId) -> BillingResult<InventoryItem> {
        let removed = self
            .gateway
            .delete_inventory(id)
            .await?
            .ok_or_else(|| BillingError::not_found(EntityKind::InventoryItem, id))?;

        info!("inventory item {id} deleted");
        self.announce(RelayEventKind::Deleted, EntityKind::InventoryItem, id, &removed)
            .await;
        Ok(removed)
    }

    /// Validates the draft, then stores it together with its stock movements.
    /// Sales that would oversell any product fail with nothing committed.
    pub async fn submit(&self, builder: BillBuilder) -> BillingResult<Bill> {
        let draft = builder.build()?;
        let role = draft.kind.counterparty_role();
        if self
            .gateway
            .get_party(role, draft.counterparty_id)
            .await?
            .is_none()
        {
            return Err(BillingError::not_found(
                role.entity_kind(),
                draft.counterparty_id,
            ));
        }

        let plan = StockPlan::for_bill(draft.kind, &draft.items)?;
        let committed = self.gateway.commit_bill(draft, &plan).await?;
        let bill = committed.bill;

        info!(
            "{} {} committed: grand total {} across {} lines",
            bill.kind.entity_kind(),
            bill.id,
            bill.totals.rounded().grand_total,
            bill.items.len()
        );

        self.announce(RelayEventKind::Created, bill.kind.entity_kind(), bill.id, &bill)
            .await;
        for item in &committed.stock {
            self.announce(
                RelayEventKind::StockRefreshed,
                EntityKind::InventoryItem,
                item.id,
                item,
            )
            .await;
        }

        Ok(bill)
    }

    /// Turns an accepted quotation into an invoice. The proforma is kept.
    pub async fn convert_proforma(&self, proforma_id: EntityId) -> BillingResult<Bill> {
        let proforma = self.require_bill(proforma_id).await?;
        if proforma.kind != BillKind::Proforma {
            return Err(BillingError::validation(format!(
                "{} {proforma_id} is not a proforma",
                proforma.kind.entity_kind()
            )));
        }

        let builder = BillBuilder::new(
            BillKind::Invoice,
            proforma.counterparty_id,
            proforma.jurisdiction,
        )
        .with_items(proforma.items);
        self.submit(builder).await
    }

    /// Non-positive amounts fail before the gateway is asked for the bill;
    /// the rest is checked against the stored balance before anything is
    /// written. Pass a `reference` to make resubmission safe.
    pub async fn record_payment(
        &self,
        bill_id: EntityId,
        request: PaymentRequest,
    ) -> BillingResult<PaymentReceipt> {
        request.check_amount()?;
        let mut bill = self.require_bill(bill_id).await?;
        let outcome = bill.record_payment(&request)?;

        if outcome == PaymentOutcome::Duplicate {
            info!("payment {:?} already recorded on bill {bill_id}", request.reference);
            return Ok(PaymentReceipt { bill, outcome });
        }

        let bill = self.save_ledger(bill).await?;
        info!(
            "payment of {} recorded on bill {bill_id}, {} pending",
            request.amount,
            bill.ledger
                .as_ref()
                .map(|ledger| ledger.amount_pending())
                .unwrap_or_default()
        );
        Ok(PaymentReceipt { bill, outcome })
    }

    pub async fn mark_paid(&self, bill_id: EntityId) -> BillingResult<Bill> {
        let mut bill = self.require_bill(bill_id).await?;
        bill.mark_paid()?;
        self.save_ledger(bill).await
    }

    /// Administrative undo of every recorded payment.
    pub async fn mark_pending(&self, bill_id: EntityId) -> BillingResult<Bill> {
        let mut bill = self.require_bill(bill_id).await?;
        bill.mark_pending()?;

        warn!("payments on bill {bill_id} reset to pending");
        self.save_ledger(bill).await
    }

    /// Administrative removal; stock is not restored.
    pub async fn delete_bill(&self, bill_id: EntityId) -> BillingResult<Bill> {
        let removed = self
            .gateway
            .delete_bill(bill_id)
            .await?
            .ok_or_else(|| BillingError::bill_not_found(bill_id))?;

        warn!("{} {bill_id} deleted", removed.kind.entity_kind());
        self.announce(
            RelayEventKind::Deleted,
            removed.kind.entity_kind(),
            bill_id,
            &removed,
        )
        .await;
        Ok(removed)
    }

    async fn require_bill(&self, bill_id: EntityId) -> BillingResult<Bill> {
        self.gateway
            .get_bill(bill_id)
            .await?
            .ok_or_else(|| BillingError::bill_not_found(bill_id))
    }

    async fn save_ledger(&self, bill: Bill) -> BillingResult<Bill> {
        let bill_id = bill.id;
        let ledger = bill
            .ledger
            .ok_or_else(|| BillingError::validation(format!("bill {bill_id} has no ledger")))?;

        let saved = self
            .gateway
            .save_ledger(bill_id, ledger)
            .await?
            .ok_or_else(|| BillingError::not_found(bill.kind.entity_kind(), bill_id))?;

        self.announce(
            RelayEventKind::Updated,
            saved.kind.entity_kind(),
            bill_id,
            &saved,
        )
        .await;
        Ok(saved)
    }

    async fn announce<T: Serialize>(
        &self,
        kind: RelayEventKind,
        entity: EntityKind,
        entity_id: EntityId,
        record: &T,
    ) {
        let event = match RelayEvent::new(kind, entity, entity_id, record) {
            Ok(event) => event,
            Err(err) => {
                warn!("failed to encode {entity} {entity_id} for relay: {err}");
                return;
            }
        };

        if let Err(err) = self.relay.publish(&event).await {
            warn!("failed to relay {kind:?} for {entity} {entity_id}: {err:#}");
        }
    }
}
