use rust_decimal::Decimal;
use thiserror::Error;

use crate::events::EntityKind;
use crate::models::EntityId;

pub type BillingResult<T> = Result<T, BillingError>;

/// Every failure a billing flow can report back to the user.
///
/// `Validation` and `InvalidAmount` are raised before the persistence gateway
/// is touched. `Gateway` means the collaborator failed and nothing should be
/// assumed committed.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// `pending` is absent when the amount was rejected before any ledger
    /// was read.
    #[error("invalid payment amount {amount}: {}", amount_limit(.pending))]
    InvalidAmount {
        amount: Decimal,
        pending: Option<Decimal>,
    },

    #[error("insufficient stock for product {product_id}: requested {requested}, on hand {on_hand}")]
    InsufficientStock {
        product_id: EntityId,
        requested: Decimal,
        on_hand: Decimal,
    },

    /// `kind` is absent for bills looked up by id alone.
    #[error("{} {id} not found", entity_label(.kind))]
    NotFound {
        kind: Option<EntityKind>,
        id: EntityId,
    },

    #[error("gateway error: {0:#}")]
    Gateway(#[from] anyhow::Error),
}

impl BillingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(kind: EntityKind, id: EntityId) -> Self {
        Self::NotFound {
            kind: Some(kind),
            id,
        }
    }

    pub fn bill_not_found(id: EntityId) -> Self {
        Self::NotFound { kind: None, id }
    }

    /// True when the failure happened before anything reached the gateway.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidAmount { .. } | Self::InsufficientStock { .. }
        )
    }
}

fn amount_limit(pending: &Option<Decimal>) -> String {
    match pending {
        Some(pending) => format!("must be positive and at most {pending} pending"),
        None => "must be positive".to_string(),
    }
}

fn entity_label(kind: &Option<EntityKind>) -> &'static str {
    kind.map_or("bill", |kind| kind.as_str())
}
