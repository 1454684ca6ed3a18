use chrono::{DateTime, Utc};
use khata_core::{BillingError, BillingResult, EntityId, EntityKind, PartyRole};
use serde::{Deserialize, Serialize};

use crate::builder::{BillDraft, Totals, compute_totals};
use crate::ledger::{PaymentLedger, PaymentOutcome, PaymentRequest, PaymentStatus};
use crate::line_item::LineItem;
use crate::tax::{Jurisdiction, TaxBreakdown};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BillKind {
    /// Sale to a customer; issues stock.
    Invoice,
    /// Purchase from a supplier; receives stock.
    Purchase,
    /// Quotation; touches neither stock nor payments.
    Proforma,
}

impl BillKind {
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Self::Invoice => EntityKind::Invoice,
            Self::Purchase => EntityKind::Purchase,
            Self::Proforma => EntityKind::Proforma,
        }
    }

    pub fn counterparty_role(&self) -> PartyRole {
        match self {
            Self::Invoice | Self::Proforma => PartyRole::Customer,
            Self::Purchase => PartyRole::Supplier,
        }
    }

    pub fn tracks_payments(&self) -> bool {
        !matches!(self, Self::Proforma)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "BillRecord")]
pub struct Bill {
    pub id: EntityId,
    pub kind: BillKind,
    pub counterparty_id: EntityId,
    pub jurisdiction: Jurisdiction,
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub tax_breakdown: TaxBreakdown,
    pub ledger: Option<PaymentLedger>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn from_draft(draft: BillDraft, id: EntityId, created_at: DateTime<Utc>) -> Self {
        let ledger = draft
            .kind
            .tracks_payments()
            .then(|| PaymentLedger::new(draft.totals.grand_total));

        Self {
            id,
            kind: draft.kind,
            counterparty_id: draft.counterparty_id,
            jurisdiction: draft.jurisdiction,
            items: draft.items,
            totals: draft.totals,
            tax_breakdown: draft.tax_breakdown,
            ledger,
            created_at,
        }
    }

    pub fn status(&self) -> Option<PaymentStatus> {
        self.ledger.as_ref().map(PaymentLedger::status)
    }

    pub fn ledger_mut(&mut self) -> BillingResult<&mut PaymentLedger> {
        let kind = self.kind;
        self.ledger.as_mut().ok_or_else(|| {
            BillingError::validation(format!("{} bills do not track payments", kind.entity_kind()))
        })
    }

    pub fn record_payment(&mut self, request: &PaymentRequest) -> BillingResult<PaymentOutcome> {
        self.ledger_mut()?.record_payment(request)
    }

    pub fn mark_paid(&mut self) -> BillingResult<()> {
        self.ledger_mut()?.mark_paid();
        Ok(())
    }

    pub fn mark_pending(&mut self) -> BillingResult<()> {
        self.ledger_mut()?.mark_pending();
        Ok(())
    }
}

/// Stored shape of a bill. Derived amounts are recomputed from the lines, a
/// stored ledger is moved onto the recomputed grand total, and a missing one
/// is opened for it.
#[derive(Debug, Deserialize)]
struct BillRecord {
    id: EntityId,
    kind: BillKind,
    counterparty_id: EntityId,
    #[serde(default)]
    jurisdiction: Jurisdiction,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    ledger: Option<PaymentLedger>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BillRecord> for Bill {
    type Error = BillingError;

    fn try_from(record: BillRecord) -> BillingResult<Self> {
        let totals = compute_totals(&record.items)?;
        let tax_breakdown = TaxBreakdown::for_total(totals.total_tax, record.jurisdiction);
        let ledger = if record.kind.tracks_payments() {
            let ledger = match record.ledger {
                Some(ledger) => ledger.rebase(totals.grand_total)?,
                None => PaymentLedger::new(totals.grand_total),
            };
            Some(ledger)
        } else {
            None
        };

        Ok(Self {
            id: record.id,
            kind: record.kind,
            counterparty_id: record.counterparty_id,
            jurisdiction: record.jurisdiction,
            items: record.items,
            totals,
            tax_breakdown,
            ledger,
            created_at: record.created_at,
        })
    }
}
