//! Live aggregate statistics over a trailing 60-second transaction window.
//!
//! Transactions carry a caller-supplied event timestamp (epoch milliseconds)
//! and an exact decimal amount. The engine maintains sum, average, maximum,
//! minimum and count of all transactions whose timestamp is inside the
//! trailing window, updating incrementally on ingest and decaying
//! automatically as buckets of same-timestamp transactions age out — no full
//! rescan on the query path.
//!
//! # Architecture
//! - [`Transaction`] / [`Statistics`]: boundary value types (serde-ready for
//!   the transport collaborator).
//! - [`window::WindowState`]: bucket table keyed by exact timestamp plus the
//!   incrementally maintained aggregate totals.
//! - [`StatsEngine`]: thread-safe facade. [`StatsEngine::record`] validates a
//!   transaction's age against the window cutoff and applies it under a single
//!   lock; [`StatsEngine::statistics`] returns the latest published snapshot
//!   without touching that lock.
//! - A background reaper task evicts each bucket exactly once, 60 seconds
//!   after the bucket's timestamp, and decrements the totals accordingly.
//!
//! Rejected transactions surface as [`StatsError::LateTransaction`]; no state
//! is touched on that path.

/// Millisecond clock shared by ingestion cutoffs and expiry timers.
pub mod clock;

/// All errors generated in `txn-stats`.
pub mod error;

/// Thread-safe statistics engine and its background expiry reaper.
pub mod engine;

/// Published aggregate snapshot type and rounding rules.
pub mod statistics;

/// Transaction value type.
pub mod transaction;

/// Bucket table and incrementally maintained aggregate totals.
pub mod window;

pub use clock::WindowClock;
pub use engine::StatsEngine;
pub use error::StatsError;
pub use statistics::Statistics;
pub use transaction::Transaction;
pub use window::WINDOW_MS;
