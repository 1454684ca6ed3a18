use rust_decimal::{Decimal, RoundingStrategy};

/// Currency values are shown with two decimals.
pub const CURRENCY_DP: u32 = 2;

/// Smallest outstanding balance still treated as owed (0.01).
pub fn settlement_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

/// Rounds for presentation only; accumulation stays unrounded.
pub fn present(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn within_epsilon(left: Decimal, right: Decimal) -> bool {
    (left - right).abs() <= settlement_epsilon()
}
