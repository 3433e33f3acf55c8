use thiserror::Error;

/// All errors generated in `txn-stats`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
pub enum StatsError {
    /// The transaction's event timestamp precedes the trailing window cutoff,
    /// so it can never contribute to the live aggregate. Raised synchronously
    /// on ingest; no state is mutated.
    #[error(
        "late transaction: timestamp {timestamp_ms}ms precedes window cutoff {cutoff_ms}ms"
    )]
    LateTransaction {
        /// Event timestamp of the rejected transaction, in epoch milliseconds.
        timestamp_ms: i64,
        /// Window cutoff (`now - 60000`) at the time of rejection.
        cutoff_ms: i64,
    },
}
