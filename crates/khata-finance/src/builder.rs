use khata_core::{BillingError, BillingResult, EntityId, money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bill::BillKind;
use crate::line_item::LineItem;
use crate::tax::{Jurisdiction, TaxBreakdown};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub total_tax: Decimal,
    pub grand_total: Decimal,
}

impl Totals {
    /// Two-decimal copy for display. Never feed it back into arithmetic.
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: money::present(self.subtotal),
            total_tax: money::present(self.total_tax),
            grand_total: money::present(self.grand_total),
        }
    }
}

/// Sums the lines without rounding anything. Fails instead of overflowing.
pub fn compute_totals(items: &[LineItem]) -> BillingResult<Totals> {
    let mut subtotal = Decimal::ZERO;
    let mut total_tax = Decimal::ZERO;
    for item in items {
        subtotal = subtotal.checked_add(item.amount()?).ok_or_else(out_of_range)?;
        total_tax = total_tax.checked_add(item.tax_amount()?).ok_or_else(out_of_range)?;
    }
    let grand_total = subtotal.checked_add(total_tax).ok_or_else(out_of_range)?;

    Ok(Totals {
        subtotal,
        total_tax,
        grand_total,
    })
}

fn out_of_range() -> BillingError {
    BillingError::validation("bill total is out of range")
}

/// Collects line items for an invoice, purchase or proforma. Lines can be
/// corrected freely until `build` hands the draft over for persistence.
#[derive(Debug, Clone)]
pub struct BillBuilder {
    kind: BillKind,
    counterparty_id: EntityId,
    jurisdiction: Jurisdiction,
    items: Vec<LineItem>,
}

impl BillBuilder {
    pub fn new(kind: BillKind, counterparty_id: EntityId, jurisdiction: Jurisdiction) -> Self {
        Self {
            kind,
            counterparty_id,
            jurisdiction,
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = LineItem>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn push(&mut self, item: LineItem) -> &mut Self {
        self.items.push(item);
        self
    }

    pub fn replace(&mut self, index: usize, item: LineItem) -> BillingResult<LineItem> {
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| BillingError::validation(format!("no line at position {}", index + 1)))?;
        Ok(std::mem::replace(slot, item))
    }

    pub fn remove(&mut self, index: usize) -> BillingResult<LineItem> {
        if index >= self.items.len() {
            return Err(BillingError::validation(format!(
                "no line at position {}",
                index + 1
            )));
        }
        Ok(self.items.remove(index))
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Running totals for an incomplete draft. Only overflow is reported;
    /// the lines themselves are not validated.
    pub fn preview(&self) -> BillingResult<Totals> {
        compute_totals(&self.items)
    }

    pub fn build(self) -> BillingResult<BillDraft> {
        if self.items.is_empty() {
            return Err(BillingError::validation("at least one line item is required"));
        }
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index + 1)?;
        }

        let totals = compute_totals(&self.items)?;
        let tax_breakdown = TaxBreakdown::for_total(totals.total_tax, self.jurisdiction);

        Ok(BillDraft {
            kind: self.kind,
            counterparty_id: self.counterparty_id,
            jurisdiction: self.jurisdiction,
            items: self.items,
            totals,
            tax_breakdown,
        })
    }
}

/// A validated bill that has not been given an identity yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillDraft {
    pub kind: BillKind,
    pub counterparty_id: EntityId,
    pub jurisdiction: Jurisdiction,
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub tax_breakdown: TaxBreakdown,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn sale() -> BillBuilder {
        BillBuilder::new(BillKind::Invoice, 1, Jurisdiction::Same)
    }

    #[test]
    fn single_line_scenario() {
        let draft = sale()
            .with_items([LineItem::new(10, dec!(10), dec!(100), dec!(18))])
            .build()
            .unwrap();

        assert_eq!(draft.totals.subtotal, dec!(1000));
        assert_eq!(draft.totals.total_tax, dec!(180));
        assert_eq!(draft.totals.grand_total, dec!(1180));
        assert_eq!(
            draft.tax_breakdown,
            TaxBreakdown::Split {
                half_a: dec!(90),
                half_b: dec!(90)
            }
        );
    }

    #[test]
    fn inter_state_uses_single_component() {
        let draft = BillBuilder::new(BillKind::Purchase, 2, Jurisdiction::Other)
            .with_items([
                LineItem::new(1, dec!(2), dec!(50), dec!(5)),
                LineItem::new(2, dec!(1), dec!(200), dec!(12)),
            ])
            .build()
            .unwrap();

        assert_eq!(draft.totals.total_tax, dec!(29));
        assert_eq!(draft.tax_breakdown, TaxBreakdown::Single { amount: dec!(29) });
    }

    #[test]
    fn empty_and_invalid_drafts_are_rejected() {
        assert!(matches!(sale().build(), Err(BillingError::Validation(_))));

        let err = sale()
            .with_items([
                LineItem::new(1, dec!(1), dec!(10), dec!(5)),
                LineItem::new(2, dec!(0), dec!(10), dec!(5)),
            ])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn accumulation_is_unrounded_until_presentation() {
        let draft = sale()
            .with_items((0..3).map(|product| LineItem::new(product, dec!(1), dec!(0.333), dec!(18))))
            .build()
            .unwrap();

        assert_eq!(draft.totals.subtotal, dec!(0.999));
        assert_eq!(draft.totals.total_tax, dec!(0.17982));
        assert_eq!(draft.totals.rounded().grand_total, dec!(1.18));
    }

    #[test]
    fn overflowing_lines_fail_validation() {
        let single = sale()
            .with_items([LineItem::new(1, Decimal::MAX, dec!(2), dec!(18))])
            .build();
        assert!(matches!(single, Err(BillingError::Validation(_))));

        // Each line fits on its own; only their sum overflows.
        let half = Decimal::MAX / dec!(2);
        let summed = sale()
            .with_items([
                LineItem::new(1, half, dec!(1), dec!(0)),
                LineItem::new(2, half, dec!(1), dec!(0)),
                LineItem::new(3, half, dec!(1), dec!(0)),
            ])
            .build();
        assert!(matches!(summed, Err(BillingError::Validation(_))));
    }

    #[test]
    fn lines_can_be_corrected_before_build() {
        let mut builder = sale();
        builder
            .push(LineItem::new(1, dec!(1), dec!(10), dec!(0)))
            .push(LineItem::new(2, dec!(5), dec!(10), dec!(0)));

        builder
            .replace(0, LineItem::new(1, dec!(3), dec!(10), dec!(0)))
            .unwrap();
        let removed = builder.remove(1).unwrap();
        assert_eq!(removed.product_id, 2);
        assert!(builder.remove(4).is_err());

        assert_eq!(builder.preview().unwrap().grand_total, dec!(30));
    }
}
