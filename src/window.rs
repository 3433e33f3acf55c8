use crate::{
    statistics::{Statistics, round_half_up},
    transaction::Transaction,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, btree_map::Entry};

/// Trailing window length in milliseconds. Fixed process-wide.
pub const WINDOW_MS: i64 = 60_000;

/// Transactions sharing one exact event timestamp.
///
/// The expiry deadline is fixed when the bucket is created; later inserts at
/// the same timestamp share the original deadline rather than extending it.
#[derive(Clone, Debug)]
pub struct Bucket {
    /// Instant at which this bucket leaves the window, in epoch milliseconds.
    pub expires_at_ms: i64,
    /// Transactions at this timestamp, in insertion order.
    pub transactions: Vec<Transaction>,
}

/// Incrementally maintained aggregate totals over all live transactions.
///
/// Extrema are `None` when no transactions are live, keeping a genuine
/// zero-amount transaction distinct from the empty state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct AggregateTotals {
    count: u64,
    sum: Decimal,
    max: Option<Decimal>,
    min: Option<Decimal>,
}

impl AggregateTotals {
    fn apply_add(&mut self, amount: Decimal) {
        self.count += 1;
        self.sum += amount;
        self.max = Some(self.max.map_or(amount, |max| max.max(amount)));
        self.min = Some(self.min.map_or(amount, |min| min.min(amount)));
    }
}

/// Live bucket table plus the aggregate totals derived from it.
///
/// Buckets are keyed by exact timestamp and every bucket expires
/// `WINDOW_MS` after its timestamp, so ascending key order is also ascending
/// expiry order: the first entry is always the next to expire. The map
/// therefore doubles as the reaper's time-ordered schedule.
#[derive(Debug, Default)]
pub struct WindowState {
    buckets: BTreeMap<i64, Bucket>,
    totals: AggregateTotals,
}

impl WindowState {
    /// Insert an accepted transaction and increment the totals.
    ///
    /// Returns `true` when a new bucket was created, meaning the reaper's
    /// earliest deadline may have changed.
    pub fn insert(&mut self, transaction: Transaction) -> bool {
        self.totals.apply_add(transaction.amount);

        match self.buckets.entry(transaction.timestamp) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().transactions.push(transaction);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(Bucket {
                    expires_at_ms: transaction.timestamp + WINDOW_MS,
                    transactions: vec![transaction],
                });
                true
            }
        }
    }

    /// Expiry deadline of the oldest live bucket, if any.
    pub fn next_expiry(&self) -> Option<i64> {
        self.buckets
            .first_key_value()
            .map(|(_, bucket)| bucket.expires_at_ms)
    }

    /// Remove the oldest bucket iff its deadline has passed, decrementing the
    /// totals once per contained transaction.
    ///
    /// Removal and decrement happen together, so a bucket can never be
    /// evicted twice or decremented partially.
    pub fn evict_next_expired(&mut self, now_ms: i64) -> Option<Bucket> {
        let expires_at_ms = self.next_expiry()?;
        if expires_at_ms > now_ms {
            return None;
        }

        let (_, bucket) = self.buckets.pop_first()?;
        for transaction in &bucket.transactions {
            self.apply_remove(transaction.amount);
        }

        Some(bucket)
    }

    /// Snapshot the current totals as a fully-formed [`Statistics`] value.
    pub fn snapshot(&self) -> Statistics {
        let avg = if self.totals.count > 0 {
            round_half_up(self.totals.sum / Decimal::from(self.totals.count))
        } else {
            Decimal::ZERO
        };

        Statistics {
            sum: self.totals.sum,
            avg,
            max: self.totals.max.unwrap_or(Decimal::ZERO),
            min: self.totals.min.unwrap_or(Decimal::ZERO),
            count: self.totals.count,
        }
    }

    /// Decrement the totals for one evicted amount, rescanning the remaining
    /// buckets for a replacement extremum only when the evicted amount held
    /// the current max or min.
    fn apply_remove(&mut self, amount: Decimal) {
        self.totals.count -= 1;
        self.totals.sum -= amount;

        if self.totals.max == Some(amount) {
            self.totals.max = self.scan_amounts().max();
        }
        if self.totals.min == Some(amount) {
            self.totals.min = self.scan_amounts().min();
        }
    }

    /// Every live amount across all buckets. Off the hot path: only used to
    /// recompute a displaced extremum.
    fn scan_amounts(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.transactions.iter().map(|transaction| transaction.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn window_with(transactions: &[(Decimal, i64)]) -> WindowState {
        let mut state = WindowState::default();
        for &(amount, timestamp) in transactions {
            state.insert(Transaction::new(amount, timestamp));
        }
        state
    }

    #[test]
    fn test_insert_maintains_totals_incrementally() {
        let mut state = WindowState::default();

        state.insert(Transaction::new(dec!(10), 1_000));
        assert_eq!(
            state.snapshot(),
            Statistics {
                sum: dec!(10),
                avg: dec!(10.00),
                max: dec!(10),
                min: dec!(10),
                count: 1,
            }
        );

        state.insert(Transaction::new(dec!(30), 1_001));
        assert_eq!(
            state.snapshot(),
            Statistics {
                sum: dec!(40),
                avg: dec!(20.00),
                max: dec!(30),
                min: dec!(10),
                count: 2,
            }
        );
    }

    #[test]
    fn test_insert_collision_shares_bucket_and_keeps_original_expiry() {
        let mut state = WindowState::default();

        assert!(state.insert(Transaction::new(dec!(5), 1_000)));
        assert_eq!(state.next_expiry(), Some(1_000 + WINDOW_MS));

        // Same timestamp: appended, no reschedule.
        assert!(!state.insert(Transaction::new(dec!(7), 1_000)));
        assert_eq!(state.next_expiry(), Some(1_000 + WINDOW_MS));

        let bucket = state.evict_next_expired(1_000 + WINDOW_MS).unwrap();
        assert_eq!(bucket.transactions.len(), 2);
        assert_eq!(state.snapshot().count, 0);
    }

    #[test]
    fn test_avg_rounds_half_up_to_two_places() {
        let state = window_with(&[(dec!(0.01), 1), (dec!(0.02), 2)]);
        // 0.015 rounds up.
        assert_eq!(state.snapshot().avg, dec!(0.02));

        let state = window_with(&[(dec!(10), 1), (dec!(10), 2), (dec!(10), 3)]);
        assert_eq!(state.snapshot().avg, dec!(10.00));

        let state = window_with(&[(dec!(1), 1), (dec!(2), 2), (dec!(2), 3)]);
        // 5/3 = 1.666.. rounds to 1.67.
        assert_eq!(state.snapshot().avg, dec!(1.67));
    }

    #[test]
    fn test_evict_before_deadline_is_a_no_op() {
        let mut state = window_with(&[(dec!(10), 1_000)]);

        assert!(state.evict_next_expired(1_000 + WINDOW_MS - 1).is_none());
        assert_eq!(state.snapshot().count, 1);

        // Deadline inclusive.
        assert!(state.evict_next_expired(1_000 + WINDOW_MS).is_some());
        assert_eq!(state.snapshot().count, 0);
    }

    #[test]
    fn test_evicting_extremum_rescans_remaining_buckets() {
        let mut state = window_with(&[
            (dec!(100), 1_000),
            (dec!(1), 1_000),
            (dec!(50), 2_000),
            (dec!(20), 3_000),
        ]);
        assert_eq!(state.snapshot().max, dec!(100));
        assert_eq!(state.snapshot().min, dec!(1));

        // Oldest bucket held both extrema; both must be rescanned.
        state.evict_next_expired(1_000 + WINDOW_MS).unwrap();
        let statistics = state.snapshot();
        assert_eq!(statistics.max, dec!(50));
        assert_eq!(statistics.min, dec!(20));
        assert_eq!(statistics.sum, dec!(70));
        assert_eq!(statistics.count, 2);
    }

    #[test]
    fn test_evicting_non_extremum_does_not_change_extrema() {
        let mut state = window_with(&[(dec!(5), 1_000), (dec!(100), 2_000), (dec!(1), 3_000)]);

        state.evict_next_expired(1_000 + WINDOW_MS).unwrap();
        let statistics = state.snapshot();
        assert_eq!(statistics.max, dec!(100));
        assert_eq!(statistics.min, dec!(1));
    }

    #[test]
    fn test_empty_window_reports_zeros() {
        let mut state = window_with(&[(dec!(12.34), 1_000)]);
        state.evict_next_expired(1_000 + WINDOW_MS).unwrap();

        assert_eq!(state.snapshot(), Statistics::default());
        assert_eq!(state.next_expiry(), None);
    }

    #[test]
    fn test_zero_amount_transaction_is_distinct_from_empty() {
        let state = window_with(&[(dec!(0), 1_000), (dec!(5), 2_000)]);

        let statistics = state.snapshot();
        assert_eq!(statistics.min, dec!(0));
        assert_eq!(statistics.max, dec!(5));
        assert_eq!(statistics.count, 2);

        // A later positive amount must not displace the genuine zero minimum.
        let mut state = state;
        state.insert(Transaction::new(dec!(3), 3_000));
        assert_eq!(state.snapshot().min, dec!(0));
    }

    #[test]
    fn test_eviction_order_follows_timestamps_not_insertion() {
        let mut state = WindowState::default();
        state.insert(Transaction::new(dec!(2), 5_000));
        state.insert(Transaction::new(dec!(1), 1_000));

        let bucket = state.evict_next_expired(10_000 + WINDOW_MS).unwrap();
        assert_eq!(bucket.transactions[0].amount, dec!(1));

        let bucket = state.evict_next_expired(10_000 + WINDOW_MS).unwrap();
        assert_eq!(bucket.transactions[0].amount, dec!(2));

        assert!(state.evict_next_expired(10_000 + WINDOW_MS).is_none());
    }
}
