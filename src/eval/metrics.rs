//! Ranking-quality metrics: Accuracy@K, Mean Reciprocal Rank (MRR), average rank.

use crate::store::TestResult;
use serde::Serialize;

/// A record carrying the 1-based rank at which the correct item was returned.
///
/// The aggregator reads nothing else from a record.
pub trait RankedRecord {
    fn correct_rank(&self) -> Option<i64>;
}

impl RankedRecord for TestResult {
    fn correct_rank(&self) -> Option<i64> {
        self.correct_rank
    }
}

impl RankedRecord for Option<i64> {
    fn correct_rank(&self) -> Option<i64> {
        *self
    }
}

impl<R: RankedRecord> RankedRecord for &R {
    fn correct_rank(&self) -> Option<i64> {
        (*self).correct_rank()
    }
}

/// Returns the rank if it counts as a hit at some position: present and > 0.
/// Absent, zero and negative ranks all mean "correct item not retrieved".
pub fn valid_rank(rank: Option<i64>) -> Option<u64> {
    rank.and_then(|r| u64::try_from(r).ok()).filter(|r| *r > 0)
}

/// Aggregate statistics for one experiment run.
///
/// Accuracy@K and MRR are divided by `total_queries`, so a query whose correct
/// item was never retrieved counts as a miss. `average_rank` is divided by
/// `successful_queries` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub accuracy_at_1: f64,
    pub accuracy_at_5: f64,
    pub accuracy_at_10: f64,
    pub mean_reciprocal_rank: f64,
    pub average_rank: f64,
    pub total_queries: usize,
    pub successful_queries: usize,
}

impl AggregateMetrics {
    /// Share of queries with a valid rank; 0 when there are no queries.
    pub fn success_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }
        self.successful_queries as f64 / self.total_queries as f64
    }
}

/// Compute the aggregate metrics for a run's result records.
///
/// Empty input is a valid, reportable state and yields the all-zero value.
/// The function is total: records without a valid rank are misses, never errors.
pub fn compute_metrics<R: RankedRecord>(results: &[R]) -> AggregateMetrics {
    let total = results.len();
    if total == 0 {
        return AggregateMetrics::default();
    }

    let valid: Vec<u64> = results
        .iter()
        .filter_map(|r| valid_rank(r.correct_rank()))
        .collect();
    let successful = valid.len();

    let accuracy_at =
        |k: u64| valid.iter().filter(|&&rank| rank <= k).count() as f64 / total as f64;
    let mrr = valid.iter().map(|&rank| 1.0 / rank as f64).sum::<f64>() / total as f64;
    let average_rank = if successful > 0 {
        valid.iter().map(|&rank| rank as f64).sum::<f64>() / successful as f64
    } else {
        0.0
    };

    AggregateMetrics {
        accuracy_at_1: accuracy_at(1),
        accuracy_at_5: accuracy_at(5),
        accuracy_at_10: accuracy_at(10),
        mean_reciprocal_rank: mrr,
        average_rank,
        total_queries: total,
        successful_queries: successful,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(values: &[Option<i64>]) -> Vec<Option<i64>> {
        values.to_vec()
    }

    #[test]
    fn empty_input_is_all_zero() {
        let metrics = compute_metrics::<Option<i64>>(&[]);
        assert_eq!(metrics, AggregateMetrics::default());
        assert_eq!(metrics.success_rate(), 0.0);
    }

    #[test]
    fn mixed_ranks_scenario() {
        let metrics = compute_metrics(&ranks(&[Some(1), Some(3), Some(0), Some(7)]));
        assert_eq!(metrics.total_queries, 4);
        assert_eq!(metrics.successful_queries, 3);
        assert!((metrics.accuracy_at_1 - 0.25).abs() < 1e-12);
        assert!((metrics.accuracy_at_5 - 0.5).abs() < 1e-12);
        assert!((metrics.accuracy_at_10 - 0.75).abs() < 1e-12);
        let expected_mrr = (1.0 + 1.0 / 3.0 + 1.0 / 7.0) / 4.0;
        assert!((metrics.mean_reciprocal_rank - expected_mrr).abs() < 1e-12);
        assert!((metrics.mean_reciprocal_rank - 0.3690).abs() < 1e-4);
        assert!((metrics.average_rank - 11.0 / 3.0).abs() < 1e-12);
        assert!((metrics.success_rate() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn all_missing_ranks() {
        let metrics = compute_metrics(&ranks(&[None, Some(0), None]));
        assert_eq!(metrics.total_queries, 3);
        assert_eq!(metrics.successful_queries, 0);
        assert_eq!(metrics.accuracy_at_1, 0.0);
        assert_eq!(metrics.accuracy_at_10, 0.0);
        assert_eq!(metrics.mean_reciprocal_rank, 0.0);
        assert_eq!(metrics.average_rank, 0.0);
    }

    #[test]
    fn all_first_rank() {
        let metrics = compute_metrics(&ranks(&[Some(1); 5]));
        assert_eq!(metrics.accuracy_at_1, 1.0);
        assert_eq!(metrics.accuracy_at_5, 1.0);
        assert_eq!(metrics.accuracy_at_10, 1.0);
        assert_eq!(metrics.mean_reciprocal_rank, 1.0);
        assert_eq!(metrics.average_rank, 1.0);
    }

    #[test]
    fn negative_rank_is_a_miss() {
        let metrics = compute_metrics(&ranks(&[Some(-3), Some(2)]));
        assert_eq!(metrics.successful_queries, 1);
        assert_eq!(metrics.accuracy_at_1, 0.0);
        assert!((metrics.accuracy_at_5 - 0.5).abs() < 1e-12);
        assert!((metrics.mean_reciprocal_rank - 0.25).abs() < 1e-12);
        assert_eq!(metrics.average_rank, 2.0);
    }

    #[test]
    fn ranks_beyond_ten_count_only_for_mrr_and_average() {
        let metrics = compute_metrics(&ranks(&[Some(20), Some(40)]));
        assert_eq!(metrics.accuracy_at_10, 0.0);
        assert_eq!(metrics.successful_queries, 2);
        assert!((metrics.mean_reciprocal_rank - (1.0 / 20.0 + 1.0 / 40.0) / 2.0).abs() < 1e-12);
        assert_eq!(metrics.average_rank, 30.0);
    }

    #[test]
    fn reads_rank_from_test_results() {
        let results = vec![
            TestResult {
                correct_rank: Some(2),
                ..TestResult::default()
            },
            TestResult::default(),
        ];
        let metrics = compute_metrics(&results);
        assert_eq!(metrics.total_queries, 2);
        assert_eq!(metrics.successful_queries, 1);
        assert!((metrics.mean_reciprocal_rank - 0.25).abs() < 1e-12);

        let borrowed: Vec<&TestResult> = results.iter().collect();
        assert_eq!(compute_metrics(&borrowed), metrics);
    }

    #[test]
    fn valid_rank_predicate() {
        assert_eq!(valid_rank(Some(4)), Some(4));
        assert_eq!(valid_rank(Some(0)), None);
        assert_eq!(valid_rank(Some(-1)), None);
        assert_eq!(valid_rank(None), None);
        assert_eq!(valid_rank(Some(i64::MAX)), Some(i64::MAX as u64));
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        fn arb_rank() -> impl Strategy<Value = Option<i64>> {
            prop_oneof![
                Just(None),
                (-5_i64..=0).prop_map(Some),
                (1_i64..=50).prop_map(Some),
            ]
        }

        proptest! {
            #[test]
            fn accuracy_bounded_and_monotonic(ranks in prop::collection::vec(arb_rank(), 1..200)) {
                let m = compute_metrics(&ranks);
                for acc in [m.accuracy_at_1, m.accuracy_at_5, m.accuracy_at_10] {
                    prop_assert!((0.0..=1.0).contains(&acc));
                }
                prop_assert!(m.accuracy_at_1 <= m.accuracy_at_5);
                prop_assert!(m.accuracy_at_5 <= m.accuracy_at_10);
                prop_assert!(m.successful_queries <= m.total_queries);
                prop_assert!(m.mean_reciprocal_rank <= m.success_rate() + 1e-12);
            }

            #[test]
            fn deterministic(ranks in prop::collection::vec(arb_rank(), 0..200)) {
                let first = compute_metrics(&ranks);
                let second = compute_metrics(&ranks);
                prop_assert_eq!(first.accuracy_at_1.to_bits(), second.accuracy_at_1.to_bits());
                prop_assert_eq!(
                    first.mean_reciprocal_rank.to_bits(),
                    second.mean_reciprocal_rank.to_bits()
                );
                prop_assert_eq!(first.average_rank.to_bits(), second.average_rank.to_bits());
                prop_assert_eq!(first, second);
            }

            #[test]
            fn average_rank_within_valid_range(ranks in prop::collection::vec(arb_rank(), 1..200)) {
                let m = compute_metrics(&ranks);
                if m.successful_queries == 0 {
                    prop_assert_eq!(m.average_rank, 0.0);
                } else {
                    prop_assert!(m.average_rank >= 1.0 && m.average_rank <= 50.0);
                }
            }
        }
    }
}
