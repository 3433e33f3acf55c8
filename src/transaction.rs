use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary transaction observed at a caller-supplied event time.
///
/// `timestamp` is the event time in epoch milliseconds, not receipt time, so
/// transactions may arrive out of order or ahead of the wall clock.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize, Constructor,
)]
pub struct Transaction {
    /// Exact decimal transaction amount.
    pub amount: Decimal,
    /// Event time in epoch milliseconds.
    pub timestamp: i64,
}
