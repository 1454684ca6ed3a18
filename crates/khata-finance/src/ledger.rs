use chrono::{DateTime, Utc};
use khata_core::{BillingError, BillingResult, money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const FULL_SETTLEMENT_NOTE: &str = "full settlement";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }

    fn derive(total: Decimal, paid: Decimal, pending: Decimal) -> Self {
        if pending <= money::settlement_epsilon() {
            Self::Paid
        } else if paid.is_zero() || pending >= total {
            Self::Pending
        } else {
            Self::Partial
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentEntry {
    pub amount: Decimal,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
    /// Client-chosen token that makes a retried submission a no-op.
    #[serde(default)]
    pub reference: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub reference: Option<Uuid>,
}

impl PaymentRequest {
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            note: String::new(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Uuid) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Rejects amounts no balance could accept. Needs no ledger, so callers
    /// can run it before loading one.
    pub fn check_amount(&self) -> BillingResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(BillingError::InvalidAmount {
                amount: self.amount,
                pending: None,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Recorded,
    /// The reference was already in the history; nothing changed.
    Duplicate,
}

/// Paid/pending ledger of one invoice or purchase.
///
/// Invariants: `amount_paid + amount_pending == total_amount`, both are
/// non-negative, the history sums to `amount_paid`, and `status` agrees with
/// `amount_pending`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "LedgerRecord")]
pub struct PaymentLedger {
    total_amount: Decimal,
    amount_paid: Decimal,
    amount_pending: Decimal,
    history: Vec<PaymentEntry>,
    status: PaymentStatus,
}

impl PaymentLedger {
    pub fn new(total_amount: Decimal) -> Self {
        Self {
            total_amount,
            amount_paid: Decimal::ZERO,
            amount_pending: total_amount,
            history: Vec::new(),
            status: PaymentStatus::derive(total_amount, Decimal::ZERO, total_amount),
        }
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    pub fn amount_pending(&self) -> Decimal {
        self.amount_pending
    }

    pub fn history(&self) -> &[PaymentEntry] {
        &self.history
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    /// Rebuilds the derived amounts from `history` against `total_amount`.
    /// The history is the record of truth; it may not exceed the total.
    fn from_history(total_amount: Decimal, history: Vec<PaymentEntry>) -> BillingResult<Self> {
        if total_amount < Decimal::ZERO {
            return Err(BillingError::validation(format!(
                "ledger total {total_amount} cannot be negative"
            )));
        }

        let mut amount_paid = Decimal::ZERO;
        for entry in &history {
            if entry.amount <= Decimal::ZERO {
                return Err(BillingError::validation(format!(
                    "recorded payment {} must be positive",
                    entry.amount
                )));
            }
            amount_paid = amount_paid
                .checked_add(entry.amount)
                .ok_or_else(|| BillingError::validation("payment history total is out of range"))?;
        }

        let mut amount_pending = total_amount - amount_paid;
        if amount_pending < -money::settlement_epsilon() {
            return Err(BillingError::validation(format!(
                "payments of {amount_paid} exceed ledger total {total_amount}"
            )));
        }
        if !history.is_empty() && amount_pending <= money::settlement_epsilon() {
            amount_paid = total_amount;
            amount_pending = Decimal::ZERO;
        }

        Ok(Self {
            total_amount,
            amount_paid,
            amount_pending,
            history,
            status: PaymentStatus::derive(total_amount, amount_paid, amount_pending),
        })
    }

    /// Moves the ledger onto a new total, keeping every recorded payment.
    pub fn rebase(self, total_amount: Decimal) -> BillingResult<Self> {
        if total_amount == self.total_amount {
            return Ok(self);
        }
        Self::from_history(total_amount, self.history)
    }

    /// Settles whatever is outstanding. Calling it on a settled ledger
    /// changes nothing.
    pub fn mark_paid(&mut self) {
        if self.status == PaymentStatus::Paid && self.amount_pending.is_zero() {
            return;
        }

        let outstanding = self.amount_pending;
        if outstanding > Decimal::ZERO {
            self.history.push(PaymentEntry {
                amount: outstanding,
                recorded_at: Utc::now(),
                note: FULL_SETTLEMENT_NOTE.to_string(),
                reference: None,
            });
        }
        self.amount_paid = self.total_amount;
        self.amount_pending = Decimal::ZERO;
        self.status = PaymentStatus::Paid;
    }

    /// Administrative undo: forgets every payment.
    pub fn mark_pending(&mut self) {
        self.amount_paid = Decimal::ZERO;
        self.amount_pending = self.total_amount;
        self.history.clear();
        self.status = PaymentStatus::derive(self.total_amount, Decimal::ZERO, self.total_amount);
    }

    /// Appends a payment. Not idempotent unless the request carries a
    /// reference; a reference already in the history short-circuits before
    /// the amount is checked, so a retry after the balance moved is still a
    /// no-op.
    pub fn record_payment(&mut self, request: &PaymentRequest) -> BillingResult<PaymentOutcome> {
        if let Some(reference) = request.reference
            && self
                .history
                .iter()
                .any(|entry| entry.reference == Some(reference))
        {
            return Ok(PaymentOutcome::Duplicate);
        }

        request.check_amount()?;
        if request.amount > self.amount_pending {
            return Err(BillingError::InvalidAmount {
                amount: request.amount,
                pending: Some(self.amount_pending),
            });
        }

        self.history.push(PaymentEntry {
            amount: request.amount,
            recorded_at: Utc::now(),
            note: request.note.trim().to_string(),
            reference: request.reference,
        });
        self.amount_paid += request.amount;
        self.amount_pending -= request.amount;

        if self.amount_pending <= money::settlement_epsilon() {
            self.amount_pending = Decimal::ZERO;
            self.amount_paid = self.total_amount;
            self.status = PaymentStatus::Paid;
        } else {
            self.status = PaymentStatus::Partial;
        }

        Ok(PaymentOutcome::Recorded)
    }

    pub fn is_consistent(&self) -> bool {
        let history_total: Decimal = self.history.iter().map(|entry| entry.amount).sum();

        money::within_epsilon(self.amount_paid + self.amount_pending, self.total_amount)
            && self.amount_paid >= Decimal::ZERO
            && self.amount_pending >= Decimal::ZERO
            && money::within_epsilon(history_total, self.amount_paid)
            && self.status
                == PaymentStatus::derive(self.total_amount, self.amount_paid, self.amount_pending)
    }
}

/// Stored shape of a ledger. Paid and pending are rebuilt from the history
/// once, here; a stored `amount_paid` that disagrees with it is rejected.
#[derive(Debug, Deserialize)]
struct LedgerRecord {
    total_amount: Decimal,
    #[serde(default)]
    amount_paid: Option<Decimal>,
    #[serde(default)]
    history: Vec<PaymentEntry>,
}

impl TryFrom<LedgerRecord> for PaymentLedger {
    type Error = BillingError;

    fn try_from(record: LedgerRecord) -> BillingResult<Self> {
        let ledger = Self::from_history(record.total_amount, record.history)?;

        if let Some(stored) = record.amount_paid
            && !money::within_epsilon(stored, ledger.amount_paid)
        {
            return Err(BillingError::validation(format!(
                "stored amount_paid {stored} disagrees with payment history {}",
                ledger.amount_paid
            )));
        }

        Ok(ledger)
    }
}
