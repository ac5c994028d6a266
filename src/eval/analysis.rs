//! Per-query inspection helpers used by the analysis and export reports.

use crate::eval::metrics::valid_rank;
use crate::store::TestResult;
use std::collections::HashSet;

/// Worst rank that still counts as "found" in failure listings.
pub const FOUND_RANK_CUTOFF: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankStatus {
    /// Correct item ranked first
    Hit,
    /// Correct item in the top 5
    Near,
    Miss,
}

impl RankStatus {
    pub fn of(rank: Option<i64>) -> Self {
        match valid_rank(rank) {
            Some(1) => RankStatus::Hit,
            Some(r) if r <= 5 => RankStatus::Near,
            _ => RankStatus::Miss,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            RankStatus::Hit => "✅",
            RankStatus::Near => "⚠️",
            RankStatus::Miss => "❌",
        }
    }
}

/// Queries whose correct item was not found or ranked below the cutoff.
pub fn failed_queries(results: &[TestResult]) -> Vec<&TestResult> {
    results
        .iter()
        .filter(|r| valid_rank(r.correct_rank).map_or(true, |rank| rank > FOUND_RANK_CUTOFF))
        .collect()
}

/// Distinct non-empty generated queries.
pub fn unique_queries(results: &[TestResult]) -> HashSet<&str> {
    results
        .iter()
        .filter_map(|r| r.generated_query.as_deref())
        .filter(|q| !q.is_empty())
        .collect()
}

/// Query overlap of another run relative to a reference run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOverlap {
    pub reference_unique: usize,
    pub other_unique: usize,
    pub shared: usize,
    /// Shared queries as a percentage of the reference run's unique queries.
    pub percent: f64,
}

impl QueryOverlap {
    pub fn between(reference: &[TestResult], other: &[TestResult]) -> Self {
        let reference_queries = unique_queries(reference);
        let other_queries = unique_queries(other);
        let shared = reference_queries.intersection(&other_queries).count();
        let percent = if reference_queries.is_empty() {
            0.0
        } else {
            shared as f64 / reference_queries.len() as f64 * 100.0
        };
        Self {
            reference_unique: reference_queries.len(),
            other_unique: other_queries.len(),
            shared,
            percent,
        }
    }
}

/// Rank as shown in listings: the stored value, or 0 when absent.
pub fn display_rank(result: &TestResult) -> i64 {
    result.correct_rank.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(query: &str, rank: Option<i64>) -> TestResult {
        TestResult {
            generated_query: Some(query.to_string()),
            correct_rank: rank,
            ..TestResult::default()
        }
    }

    #[test]
    fn rank_status_buckets() {
        assert_eq!(RankStatus::of(Some(1)), RankStatus::Hit);
        assert_eq!(RankStatus::of(Some(5)), RankStatus::Near);
        assert_eq!(RankStatus::of(Some(6)), RankStatus::Miss);
        assert_eq!(RankStatus::of(Some(0)), RankStatus::Miss);
        assert_eq!(RankStatus::of(None), RankStatus::Miss);
        assert_eq!(RankStatus::Hit.marker(), "✅");
    }

    #[test]
    fn failed_queries_include_missing_and_deep_ranks() {
        let results = vec![
            result("a", Some(1)),
            result("b", None),
            result("c", Some(10)),
            result("d", Some(11)),
            result("e", Some(0)),
        ];
        let failed: Vec<&str> = failed_queries(&results).iter().map(|r| r.query()).collect();
        assert_eq!(failed, vec!["b", "d", "e"]);
    }

    #[test]
    fn overlap_relative_to_reference() {
        let reference = vec![
            result("chair", Some(1)),
            result("lamp", Some(2)),
            result("chair", Some(1)),
            result("", None),
        ];
        let other = vec![result("lamp", Some(1)), result("sofa", Some(3))];
        let overlap = QueryOverlap::between(&reference, &other);
        assert_eq!(overlap.reference_unique, 2);
        assert_eq!(overlap.other_unique, 2);
        assert_eq!(overlap.shared, 1);
        assert!((overlap.percent - 50.0).abs() < 1e-12);
    }

    #[test]
    fn overlap_with_empty_reference() {
        let overlap = QueryOverlap::between(&[], &[result("lamp", Some(1))]);
        assert_eq!(overlap.shared, 0);
        assert_eq!(overlap.percent, 0.0);
    }
}
