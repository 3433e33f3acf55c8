use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Aggregate view of all transactions currently inside the trailing window.
///
/// Published as a whole value after every mutation, so readers always observe
/// an internally consistent combination of fields. `max` and `min` report 0
/// when no transactions are live; `avg` is `sum / count` rounded half-up to
/// two decimal places, or 0 when `count` is 0.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct Statistics {
    /// Total of all live transaction amounts.
    pub sum: Decimal,
    /// `sum / count` rounded half-up to two decimal places, or 0 if empty.
    pub avg: Decimal,
    /// Highest live transaction amount, or 0 if empty.
    pub max: Decimal,
    /// Lowest live transaction amount, or 0 if empty.
    pub min: Decimal,
    /// Number of live transactions.
    pub count: u64,
}

/// Round a decimal to two places, half-up (midpoints round away from zero).
pub(crate) fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
