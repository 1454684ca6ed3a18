use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, BillingResult};
use crate::events::EntityKind;

/// Server-assigned numeric identity.
pub type EntityId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Customer,
    Supplier,
}

impl PartyRole {
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Self::Customer => EntityKind::Customer,
            Self::Supplier => EntityKind::Supplier,
        }
    }
}

/// A customer or a supplier. Both share one shape; the gateway keeps them in
/// separate collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Party {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartyDraft {
    pub name: String,
    pub phone: Option<String>,
    pub gstin: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
}

impl PartyDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Trims every field, drops blank optionals and upper-cases the GSTIN.
    pub fn normalize(self) -> BillingResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(BillingError::validation("name is required"));
        }

        let gstin = non_blank(self.gstin).map(|value| value.to_ascii_uppercase());
        if let Some(gstin) = &gstin
            && gstin.len() != 15
        {
            return Err(BillingError::validation("gstin must be 15 characters"));
        }

        Ok(Self {
            name,
            phone: non_blank(self.phone),
            gstin,
            state: non_blank(self.state),
            address: non_blank(self.address),
        })
    }

    pub fn into_party(self, id: EntityId, created_at: DateTime<Utc>) -> Party {
        Party {
            id,
            name: self.name,
            phone: self.phone,
            gstin: self.gstin,
            state: self.state,
            address: self.address,
            created_at,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
