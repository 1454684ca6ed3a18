use std::str::FromStr;

use khata_core::BillingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether buyer and seller are registered in the same state. Supplied by the
/// caller, never inferred.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    #[default]
    Same,
    Other,
}

impl Jurisdiction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Same => "same",
            Self::Other => "other",
        }
    }
}

impl FromStr for Jurisdiction {
    type Err = BillingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "same" | "intra" => Ok(Self::Same),
            "other" | "inter" => Ok(Self::Other),
            other => Err(BillingError::validation(format!(
                "jurisdiction must be same or other, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaxBreakdown {
    /// CGST and SGST, each half of the total.
    Split { half_a: Decimal, half_b: Decimal },
    /// IGST.
    Single { amount: Decimal },
}

impl TaxBreakdown {
    pub fn for_total(total_tax: Decimal, jurisdiction: Jurisdiction) -> Self {
        match jurisdiction {
            Jurisdiction::Same => {
                let half = total_tax / Decimal::TWO;
                Self::Split {
                    half_a: half,
                    half_b: half,
                }
            }
            Jurisdiction::Other => Self::Single { amount: total_tax },
        }
    }

    pub fn total(&self) -> Decimal {
        match self {
            Self::Split { half_a, half_b } => half_a + half_b,
            Self::Single { amount } => *amount,
        }
    }

    /// Labelled components in print order.
    pub fn components(&self) -> Vec<(&'static str, Decimal)> {
        match self {
            Self::Split { half_a, half_b } => vec![("CGST", *half_a), ("SGST", *half_b)],
            Self::Single { amount } => vec![("IGST", *amount)],
        }
    }
}
