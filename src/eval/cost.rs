//! Token cost estimates for a run.

use crate::config::PricingConfig;
use crate::store::TestRun;
use serde::Serialize;

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunCost {
    pub search_tokens: u64,
    pub tester_tokens: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    /// 0 when the run has no queries.
    pub cost_per_query: f64,
}

impl RunCost {
    pub fn from_run(run: &TestRun, pricing: &PricingConfig, total_queries: usize) -> Self {
        let search_cost =
            run.total_search_tokens as f64 / TOKENS_PER_UNIT * pricing.search_usd_per_million;
        let tester_cost =
            run.total_tester_tokens as f64 / TOKENS_PER_UNIT * pricing.tester_usd_per_million;
        let total_cost_usd = search_cost + tester_cost;

        Self {
            search_tokens: run.total_search_tokens,
            tester_tokens: run.total_tester_tokens,
            total_tokens: run.total_tokens(),
            total_cost_usd,
            cost_per_query: if total_queries > 0 {
                total_cost_usd / total_queries as f64
            } else {
                0.0
            },
        }
    }
}
