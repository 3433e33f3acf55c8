use crate::{
    clock::WindowClock,
    error::StatsError,
    statistics::Statistics,
    transaction::Transaction,
    window::{WINDOW_MS, WindowState},
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::{sync::Notify, task::JoinHandle, time};
use tracing::debug;

/// State shared between [`StatsEngine`] handles and the reaper task.
#[derive(Debug)]
struct Shared {
    clock: WindowClock,
    /// Single mutual-exclusion domain for the bucket table and totals.
    /// Producers and the reaper serialize here; nothing else mutates them.
    state: Mutex<WindowState>,
    /// Last fully-formed snapshot, written only while `state` is held.
    published: RwLock<Statistics>,
    /// Signals the reaper that an earlier expiry deadline may exist.
    expiry_changed: Notify,
}

/// Aborts the reaper task when the last [`StatsEngine`] handle drops.
#[derive(Debug)]
struct ReaperGuard(JoinHandle<()>);

impl Drop for ReaperGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Thread-safe handle to the trailing-window statistics engine.
///
/// Cloning is cheap and shares the same window. Producers on any thread call
/// [`StatsEngine::record`]; a background reaper task evicts each bucket of
/// same-timestamp transactions exactly once, [`WINDOW_MS`] after the bucket's
/// timestamp, decrementing the aggregate under the same lock used for
/// ingestion. The reaper stops when the last handle is dropped.
#[derive(Clone, Debug)]
pub struct StatsEngine {
    shared: Arc<Shared>,
    _reaper: Arc<ReaperGuard>,
}

impl StatsEngine {
    /// Start an engine on the current wall clock.
    ///
    /// Must be called within a tokio runtime: the expiry reaper is spawned
    /// onto it.
    pub fn new() -> Self {
        Self::with_clock(WindowClock::new())
    }

    /// Start an engine on the provided clock.
    ///
    /// Combined with [`WindowClock::anchored_at`] and a paused test runtime
    /// this makes ingestion cutoffs and expiry fully deterministic.
    pub fn with_clock(clock: WindowClock) -> Self {
        let shared = Arc::new(Shared {
            clock,
            state: Mutex::new(WindowState::default()),
            published: RwLock::new(Statistics::default()),
            expiry_changed: Notify::new(),
        });

        let reaper = tokio::spawn(run_reaper(Arc::clone(&shared)));

        Self {
            shared,
            _reaper: Arc::new(ReaperGuard(reaper)),
        }
    }

    /// Record a transaction, rejecting it when its event time has already
    /// left the trailing window.
    ///
    /// A timestamp exactly on the cutoff is accepted; future-dated timestamps
    /// are accepted as-is and simply expire `WINDOW_MS` after their event
    /// time. On acceptance the bucket table and totals are updated under one
    /// lock and a fresh [`Statistics`] snapshot is published before the lock
    /// is released. On rejection no state is touched.
    pub fn record(&self, transaction: Transaction) -> Result<(), StatsError> {
        let cutoff_ms = self.shared.clock.now_ms() - WINDOW_MS;
        if transaction.timestamp < cutoff_ms {
            debug!(?transaction, cutoff_ms, "rejected late transaction");
            return Err(StatsError::LateTransaction {
                timestamp_ms: transaction.timestamp,
                cutoff_ms,
            });
        }

        let created_bucket = {
            let mut state = self.shared.state.lock();
            let created_bucket = state.insert(transaction);
            *self.shared.published.write() = state.snapshot();
            created_bucket
        };

        if created_bucket {
            // A fresh bucket may expire before the deadline the reaper is
            // currently sleeping towards.
            self.shared.expiry_changed.notify_one();
        }

        debug!(?transaction, "recorded transaction");
        Ok(())
    }

    /// Latest published aggregate snapshot.
    ///
    /// Reads only the snapshot cell: never blocks on reaper progress, and may
    /// trail a just-expired bucket by at most one reaper tick. Repeated calls
    /// with no intervening mutation return identical values.
    pub fn statistics(&self) -> Statistics {
        *self.shared.published.read()
    }
}

impl Default for StatsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Reaper loop: sleep until the earliest bucket deadline, evict everything
/// expired, repeat. Re-arms whenever ingestion signals that a new bucket may
/// have moved the earliest deadline.
async fn run_reaper(shared: Arc<Shared>) {
    loop {
        let next_expiry = shared.state.lock().next_expiry();

        match next_expiry {
            Some(expires_at_ms) => {
                let deadline = shared.clock.deadline_for(expires_at_ms);
                tokio::select! {
                    _ = time::sleep_until(deadline) => reap_expired(&shared),
                    _ = shared.expiry_changed.notified() => {}
                }
            }
            None => shared.expiry_changed.notified().await,
        }
    }
}

/// Evict every bucket whose deadline has passed, re-acquiring the lock per
/// bucket so a large expiry backlog cannot starve ingestion.
fn reap_expired(shared: &Shared) {
    loop {
        let now_ms = shared.clock.now_ms();
        let mut state = shared.state.lock();

        let Some(bucket) = state.evict_next_expired(now_ms) else {
            break;
        };
        *shared.published.write() = state.snapshot();
        drop(state);

        debug!(
            expires_at_ms = bucket.expires_at_ms,
            transactions = bucket.transactions.len(),
            "expired bucket"
        );
    }
}
