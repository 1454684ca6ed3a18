use khata_core::{BillingError, BillingResult, EntityId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Physical size of a cut or sheet good. Informational; billing always uses
/// `LineItem::quantity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    #[serde(default)]
    pub length: Option<Decimal>,
    #[serde(default)]
    pub width: Option<Decimal>,
    #[serde(default)]
    pub piece_count: Option<Decimal>,
}

impl Dimensions {
    pub fn area(&self) -> Option<Decimal> {
        let pieces = self.piece_count.unwrap_or(Decimal::ONE);
        self.length?.checked_mul(self.width?)?.checked_mul(pieces)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: EntityId,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Percent, 0 to 100.
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

impl LineItem {
    pub fn new(product_id: EntityId, quantity: Decimal, unit_price: Decimal, tax_rate: Decimal) -> Self {
        Self {
            product_id,
            description: None,
            quantity,
            unit_price,
            tax_rate,
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn amount(&self) -> BillingResult<Decimal> {
        self.quantity
            .checked_mul(self.unit_price)
            .ok_or_else(|| self.out_of_range())
    }

    pub fn tax_amount(&self) -> BillingResult<Decimal> {
        self.amount()?
            .checked_mul(self.tax_rate)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| self.out_of_range())
    }

    pub fn line_total(&self) -> BillingResult<Decimal> {
        self.amount()?
            .checked_add(self.tax_amount()?)
            .ok_or_else(|| self.out_of_range())
    }

    fn out_of_range(&self) -> BillingError {
        BillingError::validation(format!(
            "product {}: line amount is out of range",
            self.product_id
        ))
    }

    pub fn validate(&self, position: usize) -> BillingResult<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(BillingError::validation(format!(
                "line {position}: quantity must be positive"
            )));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(BillingError::validation(format!(
                "line {position}: unit_price cannot be negative"
            )));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(BillingError::validation(format!(
                "line {position}: tax_rate must be between 0 and 100"
            )));
        }
        if let Some(dimensions) = &self.dimensions {
            let negative = [dimensions.length, dimensions.width, dimensions.piece_count]
                .into_iter()
                .flatten()
                .any(|value| value < Decimal::ZERO);
            if negative {
                return Err(BillingError::validation(format!(
                    "line {position}: dimensions cannot be negative"
                )));
            }
        }
        if self.line_total().is_err() {
            return Err(BillingError::validation(format!(
                "line {position}: amount is out of range"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn derived_amounts_for_a_single_line() {
        let item = LineItem::new(1, dec!(10), dec!(100), dec!(18));
        assert_eq!(item.amount().unwrap(), dec!(1000));
        assert_eq!(item.tax_amount().unwrap(), dec!(180));
        assert_eq!(item.line_total().unwrap(), dec!(1180));
    }

    #[test]
    fn fractional_rates_keep_full_precision() {
        let item = LineItem::new(1, dec!(3), dec!(33.33), dec!(2.5));
        assert_eq!(item.amount().unwrap(), dec!(99.99));
        assert_eq!(item.tax_amount().unwrap(), dec!(2.49975));
    }

    #[test]
    fn validate_rejects_bad_lines() {
        assert!(LineItem::new(1, dec!(0), dec!(10), dec!(5)).validate(1).is_err());
        assert!(LineItem::new(1, dec!(1), dec!(-1), dec!(5)).validate(1).is_err());
        assert!(LineItem::new(1, dec!(1), dec!(10), dec!(100.5)).validate(1).is_err());
        assert!(LineItem::new(1, dec!(1), dec!(0), dec!(0)).validate(1).is_ok());
    }

    #[test]
    fn oversized_line_is_rejected_instead_of_overflowing() {
        let huge = LineItem::new(1, Decimal::MAX, dec!(2), dec!(18));
        assert!(matches!(huge.amount(), Err(BillingError::Validation(_))));
        assert!(huge.line_total().is_err());

        let err = huge.validate(3).unwrap_err();
        assert!(err.to_string().contains("line 3: amount is out of range"));
    }

    #[test]
    fn area_needs_both_sides() {
        let sheet = Dimensions {
            length: Some(dec!(2.5)),
            width: Some(dec!(1.2)),
            piece_count: Some(dec!(4)),
        };
        assert_eq!(sheet.area(), Some(dec!(12.00)));

        let strip = Dimensions {
            length: Some(dec!(3)),
            ..Dimensions::default()
        };
        assert_eq!(strip.area(), None);
    }

    #[test]
    fn missing_tax_rate_defaults_to_zero() {
        let item: LineItem = serde_json::from_value(serde_json::json!({
            "product_id": 2,
            "quantity": "4",
            "unit_price": "12.50"
        }))
        .unwrap();
        assert_eq!(item.tax_rate, Decimal::ZERO);
        assert_eq!(item.line_total().unwrap(), dec!(50.00));
    }
}
