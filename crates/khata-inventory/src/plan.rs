use std::collections::BTreeMap;

use khata_core::{BillingError, BillingResult, EntityId, EntityKind};
use khata_finance::{BillKind, LineItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::item::InventoryItem;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    Issue,
    Receive,
}

impl StockDirection {
    pub fn for_bill(kind: BillKind) -> Option<Self> {
        match kind {
            BillKind::Invoice => Some(Self::Issue),
            BillKind::Purchase => Some(Self::Receive),
            BillKind::Proforma => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: EntityId,
    pub direction: StockDirection,
    pub quantity: Decimal,
    /// Quantity-weighted unit price of the lines; only receipts use it.
    pub unit_cost: Decimal,
}

/// All stock movements a bill causes, one per product.
///
/// Lines for the same product are merged so a sale split over two lines is
/// checked against stock as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockPlan {
    adjustments: Vec<StockAdjustment>,
}

impl StockPlan {
    pub fn for_bill(kind: BillKind, items: &[LineItem]) -> BillingResult<Self> {
        let Some(direction) = StockDirection::for_bill(kind) else {
            return Ok(Self::default());
        };

        let mut merged: BTreeMap<EntityId, (Decimal, Decimal)> = BTreeMap::new();
        for item in items {
            let (quantity, value) = merged.entry(item.product_id).or_default();
            *quantity = quantity
                .checked_add(item.quantity)
                .ok_or_else(|| out_of_range(item.product_id))?;
            *value = value
                .checked_add(item.amount()?)
                .ok_or_else(|| out_of_range(item.product_id))?;
        }

        let adjustments = merged
            .into_iter()
            .map(|(product_id, (quantity, value))| StockAdjustment {
                product_id,
                direction,
                quantity,
                unit_cost: if quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    value / quantity
                },
            })
            .collect();

        Ok(Self { adjustments })
    }

    pub fn adjustments(&self) -> &[StockAdjustment] {
        &self.adjustments
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    /// Every touched item in its post-adjustment state, computed on copies.
    fn adjusted(&self, stock: &BTreeMap<EntityId, InventoryItem>) -> BillingResult<Vec<InventoryItem>> {
        self.adjustments
            .iter()
            .map(|adjustment| -> BillingResult<InventoryItem> {
                let mut item = stock
                    .get(&adjustment.product_id)
                    .cloned()
                    .ok_or_else(|| BillingError::not_found(EntityKind::InventoryItem, adjustment.product_id))?;

                match adjustment.direction {
                    StockDirection::Issue => {
                        item.issue(adjustment.quantity)?;
                    }
                    StockDirection::Receive => item.receive(adjustment.quantity, adjustment.unit_cost)?,
                }
                Ok(item)
            })
            .collect()
    }

    /// Checks every adjustment against `stock` without changing anything.
    pub fn check(&self, stock: &BTreeMap<EntityId, InventoryItem>) -> BillingResult<()> {
        self.adjusted(stock).map(drop)
    }

    /// Applies the whole plan or none of it. Returns the touched items in
    /// their new state.
    pub fn apply(&self, stock: &mut BTreeMap<EntityId, InventoryItem>) -> BillingResult<Vec<InventoryItem>> {
        let touched = self.adjusted(stock)?;
        for item in &touched {
            stock.insert(item.id, item.clone());
        }
        Ok(touched)
    }
}

fn out_of_range(product_id: EntityId) -> BillingError {
    BillingError::validation(format!("stock movement for product {product_id} is out of range"))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;

    fn stock(levels: &[(EntityId, Decimal)]) -> BTreeMap<EntityId, InventoryItem> {
        levels
            .iter()
            .map(|(id, on_hand)| {
                (
                    *id,
                    InventoryItem {
                        id: *id,
                        name: format!("item-{id}"),
                        hsn_code: None,
                        unit_price: dec!(100),
                        tax_rate: dec!(18),
                        quantity_on_hand: *on_hand,
                        average_cost: dec!(60),
                        created_at: Utc::now(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn oversold_line_fails_and_leaves_stock_alone() {
        let mut levels = stock(&[(1, dec!(10))]);
        let plan = StockPlan::for_bill(
            BillKind::Invoice,
            &[LineItem::new(1, dec!(15), dec!(100), dec!(18))],
        )
        .unwrap();

        let err = plan.apply(&mut levels).unwrap_err();
        assert!(matches!(
            err,
            BillingError::InsufficientStock { product_id: 1, .. }
        ));
        assert_eq!(levels[&1].quantity_on_hand, dec!(10));
    }

    #[test]
    fn one_bad_line_blocks_every_adjustment() {
        let mut levels = stock(&[(1, dec!(50)), (2, dec!(3))]);
        let plan = StockPlan::for_bill(
            BillKind::Invoice,
            &[
                LineItem::new(1, dec!(5), dec!(100), dec!(18)),
                LineItem::new(2, dec!(4), dec!(100), dec!(18)),
            ],
        )
        .unwrap();

        assert!(plan.apply(&mut levels).is_err());
        assert_eq!(levels[&1].quantity_on_hand, dec!(50));
        assert_eq!(levels[&2].quantity_on_hand, dec!(3));
    }

    #[test]
    fn lines_for_one_product_are_checked_together() {
        let mut levels = stock(&[(1, dec!(10))]);
        let plan = StockPlan::for_bill(
            BillKind::Invoice,
            &[
                LineItem::new(1, dec!(6), dec!(100), dec!(18)),
                LineItem::new(1, dec!(6), dec!(100), dec!(18)),
            ],
        )
        .unwrap();

        assert_eq!(plan.adjustments().len(), 1);
        assert_eq!(plan.adjustments()[0].quantity, dec!(12));
        assert!(plan.apply(&mut levels).is_err());
    }

    #[test]
    fn unknown_product_is_not_found() {
        let mut levels = stock(&[]);
        let plan = StockPlan::for_bill(
            BillKind::Purchase,
            &[LineItem::new(9, dec!(1), dec!(10), dec!(0))],
        )
        .unwrap();
        assert!(matches!(
            plan.apply(&mut levels),
            Err(BillingError::NotFound { id: 9, .. })
        ));
    }

    #[test]
    fn purchase_receives_at_weighted_line_price() {
        let mut levels = stock(&[(1, dec!(10))]);
        let plan = StockPlan::for_bill(
            BillKind::Purchase,
            &[
                LineItem::new(1, dec!(5), dec!(80), dec!(18)),
                LineItem::new(1, dec!(5), dec!(100), dec!(18)),
            ],
        )
        .unwrap();

        let touched = plan.apply(&mut levels).unwrap();
        assert_eq!(touched.len(), 1);
        assert_eq!(levels[&1].quantity_on_hand, dec!(20));
        assert_eq!(levels[&1].average_cost, dec!(75));
    }

    #[test]
    fn failing_receipt_leaves_earlier_rows_untouched() {
        let mut levels = stock(&[(1, dec!(10)), (2, Decimal::MAX)]);
        let plan = StockPlan::for_bill(
            BillKind::Purchase,
            &[
                LineItem::new(1, dec!(5), dec!(80), dec!(18)),
                LineItem::new(2, dec!(5), dec!(80), dec!(18)),
            ],
        )
        .unwrap();

        assert!(plan.check(&levels).is_err());
        assert!(plan.apply(&mut levels).is_err());
        assert_eq!(levels[&1].quantity_on_hand, dec!(10));
        assert_eq!(levels[&1].average_cost, dec!(60));
    }

    #[test]
    fn oversized_merge_is_rejected() {
        let plan = StockPlan::for_bill(
            BillKind::Invoice,
            &[
                LineItem::new(1, Decimal::MAX, dec!(0), dec!(0)),
                LineItem::new(1, Decimal::MAX, dec!(0), dec!(0)),
            ],
        );
        assert!(matches!(plan, Err(BillingError::Validation(_))));
    }

    #[test]
    fn proforma_plans_nothing() {
        let plan = StockPlan::for_bill(
            BillKind::Proforma,
            &[LineItem::new(1, dec!(500), dec!(1), dec!(0))],
        )
        .unwrap();
        assert!(plan.is_empty());
    }
}
