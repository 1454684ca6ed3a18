use chrono::{DateTime, Utc};
use khata_core::{BillingError, BillingResult, EntityId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryItem {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub quantity_on_hand: Decimal,
    #[serde(default)]
    pub average_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Adds stock and moves the weighted average cost.
    pub fn receive(&mut self, quantity: Decimal, unit_cost: Decimal) -> BillingResult<()> {
        let id = self.id;
        let out_of_range =
            move || BillingError::validation(format!("stock value of product {id} is out of range"));
        let current_value = self
            .quantity_on_hand
            .checked_mul(self.average_cost)
            .ok_or_else(out_of_range)?;
        let incoming_value = quantity.checked_mul(unit_cost).ok_or_else(out_of_range)?;
        let total_value = current_value
            .checked_add(incoming_value)
            .ok_or_else(out_of_range)?;
        let new_qty = self
            .quantity_on_hand
            .checked_add(quantity)
            .ok_or_else(out_of_range)?;

        if new_qty.is_zero() {
            self.average_cost = Decimal::ZERO;
            self.quantity_on_hand = Decimal::ZERO;
            return Ok(());
        }

        self.average_cost = total_value / new_qty;
        self.quantity_on_hand = new_qty;
        Ok(())
    }

    pub fn can_issue(&self, quantity: Decimal) -> bool {
        quantity <= self.quantity_on_hand
    }

    /// Removes stock and returns its cost at the current average.
    pub fn issue(&mut self, quantity: Decimal) -> BillingResult<Decimal> {
        if !self.can_issue(quantity) {
            return Err(BillingError::InsufficientStock {
                product_id: self.id,
                requested: quantity,
                on_hand: self.quantity_on_hand,
            });
        }

        let cogs = quantity.checked_mul(self.average_cost).ok_or_else(|| {
            BillingError::validation(format!("issue cost of product {} is out of range", self.id))
        })?;
        self.quantity_on_hand -= quantity;
        Ok(cogs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryDraft {
    pub name: String,
    pub hsn_code: Option<String>,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub quantity_on_hand: Decimal,
    /// Defaults to the unit price when opening stock is given without a cost.
    pub average_cost: Option<Decimal>,
}

impl InventoryDraft {
    pub fn normalize(self) -> BillingResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(BillingError::validation("name is required"));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(BillingError::validation("unit_price cannot be negative"));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(BillingError::validation("tax_rate must be between 0 and 100"));
        }
        if self.quantity_on_hand < Decimal::ZERO {
            return Err(BillingError::validation("quantity_on_hand cannot be negative"));
        }
        if self.average_cost.is_some_and(|cost| cost < Decimal::ZERO) {
            return Err(BillingError::validation("average_cost cannot be negative"));
        }

        Ok(Self {
            name,
            hsn_code: self
                .hsn_code
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty()),
            ..self
        })
    }

    pub fn into_item(self, id: EntityId, created_at: DateTime<Utc>) -> InventoryItem {
        InventoryItem {
            id,
            name: self.name,
            hsn_code: self.hsn_code,
            unit_price: self.unit_price,
            tax_rate: self.tax_rate,
            quantity_on_hand: self.quantity_on_hand,
            average_cost: self.average_cost.unwrap_or(self.unit_price),
            created_at,
        }
    }
}
