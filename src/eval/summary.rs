//! Per-run summaries and cross-run comparisons.

use crate::config::PricingConfig;
use crate::eval::cost::RunCost;
use crate::eval::metrics::{compute_metrics, AggregateMetrics};
use crate::store::{TestResult, TestRun};

/// Minimum Accuracy@1 for a run to compete for "best value".
pub const BEST_VALUE_MIN_ACCURACY: f64 = 0.5;

/// A run together with the metrics and cost computed from its results.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run: TestRun,
    pub metrics: AggregateMetrics,
    pub cost: RunCost,
}

impl RunSummary {
    pub fn new(run: TestRun, results: &[TestResult], pricing: &PricingConfig) -> Self {
        let metrics = compute_metrics(results);
        let cost = RunCost::from_run(&run, pricing, metrics.total_queries);
        Self { run, metrics, cost }
    }
}

/// Sort by Accuracy@1, best first. Ties keep their fetch order.
pub fn rank_by_accuracy(summaries: &mut [RunSummary]) {
    summaries.sort_by(|a, b| b.metrics.accuracy_at_1.total_cmp(&a.metrics.accuracy_at_1));
}

/// Winners in each comparison category, as indices into the summary slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestPerformers {
    pub accuracy: usize,
    pub mrr: usize,
    pub lowest_cost: usize,
    /// Cheapest per query among runs above [`BEST_VALUE_MIN_ACCURACY`].
    pub value: Option<usize>,
}

impl BestPerformers {
    /// `None` for an empty slice. On ties the earliest run wins.
    pub fn find(summaries: &[RunSummary]) -> Option<Self> {
        if summaries.is_empty() {
            return None;
        }

        let accuracy = best_index(summaries, |a, b| {
            a.metrics.accuracy_at_1 > b.metrics.accuracy_at_1
        });
        let mrr = best_index(summaries, |a, b| {
            a.metrics.mean_reciprocal_rank > b.metrics.mean_reciprocal_rank
        });
        let lowest_cost = best_index(summaries, |a, b| {
            a.cost.total_cost_usd < b.cost.total_cost_usd
        });

        let value = summaries
            .iter()
            .enumerate()
            .filter(|(_, s)| s.metrics.accuracy_at_1 > BEST_VALUE_MIN_ACCURACY)
            .fold(None, |best: Option<usize>, (i, s)| match best {
                Some(b) if summaries[b].cost.cost_per_query <= s.cost.cost_per_query => Some(b),
                _ => Some(i),
            });

        Some(Self {
            accuracy,
            mrr,
            lowest_cost,
            value,
        })
    }
}

fn best_index(
    summaries: &[RunSummary],
    better: impl Fn(&RunSummary, &RunSummary) -> bool,
) -> usize {
    summaries
        .iter()
        .enumerate()
        .fold(0, |best, (i, s)| if better(s, &summaries[best]) { i } else { best })
}

/// Excludes runs known to be invalid from exports.
///
/// A pattern matches a run when the run name contains every
/// whitespace-separated fragment of the pattern.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    patterns: Vec<Vec<String>>,
}

impl RunFilter {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| p.split_whitespace().map(String::from).collect::<Vec<_>>())
                .filter(|fragments| !fragments.is_empty())
                .collect(),
        }
    }

    pub fn is_excluded(&self, run: &TestRun) -> bool {
        self.patterns
            .iter()
            .any(|fragments| fragments.iter().all(|f| run.name.contains(f.as_str())))
    }

    /// Split runs into (kept, excluded), preserving order.
    pub fn partition(&self, runs: Vec<TestRun>) -> (Vec<TestRun>, Vec<TestRun>) {
        runs.into_iter().partition(|run| !self.is_excluded(run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, search_tokens: u64) -> TestRun {
        TestRun {
            id: name.to_string(),
            name: name.to_string(),
            total_search_tokens: search_tokens,
            ..TestRun::default()
        }
    }

    fn results(ranks: &[Option<i64>]) -> Vec<TestResult> {
        ranks
            .iter()
            .map(|r| TestResult {
                correct_rank: *r,
                ..TestResult::default()
            })
            .collect()
    }

    fn summaries() -> Vec<RunSummary> {
        let pricing = PricingConfig::default();
        vec![
            // acc@1 0.5, cheap
            RunSummary::new(run("a", 1_000), &results(&[Some(1), Some(2)]), &pricing),
            // acc@1 1.0, expensive
            RunSummary::new(run("b", 9_000_000), &results(&[Some(1), Some(1)]), &pricing),
            // acc@1 0.75, mid cost
            RunSummary::new(
                run("c", 2_000_000),
                &results(&[Some(1), Some(1), Some(1), None]),
                &pricing,
            ),
        ]
    }

    #[test]
    fn rank_by_accuracy_descending() {
        let mut s = summaries();
        rank_by_accuracy(&mut s);
        let names: Vec<&str> = s.iter().map(|s| s.run.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn best_performers() {
        let s = summaries();
        let best = BestPerformers::find(&s).unwrap();
        assert_eq!(best.accuracy, 1);
        assert_eq!(best.mrr, 1);
        assert_eq!(best.lowest_cost, 0);
        // "a" sits exactly at 0.5 and does not qualify; "c" is cheaper per query than "b"
        assert_eq!(best.value, Some(2));
    }

    #[test]
    fn best_value_absent_when_no_run_qualifies() {
        let pricing = PricingConfig::default();
        let s = vec![RunSummary::new(run("x", 10), &results(&[Some(3)]), &pricing)];
        let best = BestPerformers::find(&s).unwrap();
        assert_eq!(best.value, None);
        assert!(BestPerformers::find(&[]).is_none());
    }

    #[test]
    fn run_filter_matches_all_fragments() {
        let filter = RunFilter::new(&["g25f_oai3l #1".to_string(), "   ".to_string()]);
        assert!(filter.is_excluded(&run("g25f_oai3l_gpt4o_mwM_#1", 0)));
        assert!(!filter.is_excluded(&run("g25f_oai3l_gpt4o_mwM_#2", 0)));
        assert!(!filter.is_excluded(&run("g25p_oai3l_gpt4o_mwM_#1", 0)));

        let (kept, excluded) = filter.partition(vec![
            run("g25f_oai3l_gpt4o_mwM_#1", 0),
            run("none_voy3_gpt4m_dwH_#1", 0),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(excluded.len(), 1);
        assert_eq!(kept[0].name, "none_voy3_gpt4m_dwH_#1");
    }

    #[test]
    fn default_config_excludes_void_run() {
        let filter = RunFilter::new(&crate::Config::default().reports.excluded_runs);
        assert!(filter.is_excluded(&run("g25f_oai3l_gpt4o_mwM_#1", 0)));
        assert!(!filter.is_excluded(&run("g25f_oai3l_gpt4o_mwM_#2", 0)));
        assert!(!filter.is_excluded(&run("none_oai3l_gpt4o_mwM_#1", 0)));
    }
}
