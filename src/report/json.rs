//! JSON export of every run with its configuration, metrics, cost and results.

use crate::error::Result;
use crate::eval::summary::RunSummary;
use crate::report::write_report;
use crate::store::{TestResult, TopResult};
use serde::Serialize;
use std::path::Path;

const TOP_RESULTS_PER_QUERY: usize = 10;

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub test_runs: Vec<RunExport>,
}

#[derive(Debug, Serialize)]
pub struct ExportMetadata {
    pub exported_at: String,
    pub total_runs: usize,
    #[serde(rename = "pocketbase_url")]
    pub store_url: String,
}

#[derive(Debug, Serialize)]
pub struct RunExport {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub config: RunConfigExport,
    pub metrics: MetricsExport,
    pub cost: CostExport,
    pub results: Vec<ResultExport>,
}

#[derive(Debug, Serialize)]
pub struct RunConfigExport {
    pub embedding_model: Option<String>,
    pub embedding_key: Option<String>,
    pub enrichment_model: Option<String>,
    pub tester_model: Option<String>,
    pub tester_temperature: Option<f64>,
    pub difficulty_mode: Option<String>,
    pub target_query_count: u64,
    pub completed_query_count: u64,
    pub use_sample_groups: Option<bool>,
    pub use_dynamic_weights: bool,
    pub weights: WeightsExport,
}

#[derive(Debug, Serialize)]
pub struct WeightsExport {
    pub identity: f64,
    pub physical: f64,
    pub context: f64,
}

#[derive(Debug, Serialize)]
pub struct MetricsExport {
    pub accuracy_at_1: f64,
    pub accuracy_at_5: f64,
    pub accuracy_at_10: f64,
    pub mean_reciprocal_rank: f64,
    pub average_rank: f64,
    pub total_queries: usize,
    pub successful_queries: usize,
    pub success_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct CostExport {
    pub search_tokens: u64,
    pub tester_tokens: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub cost_per_query: f64,
}

#[derive(Debug, Serialize)]
pub struct ResultExport {
    pub id: Option<String>,
    pub query: Option<String>,
    pub source_group_id: Option<String>,
    pub source_group_name: Option<String>,
    pub correct_rank: Option<i64>,
    pub query_intent: Option<String>,
    pub search_tokens: u64,
    pub tester_tokens: u64,
    pub similarity_margin: Option<f64>,
    pub applied_weights: Option<serde_json::Value>,
    pub top_results: Vec<TopResult>,
    pub created: Option<String>,
}

impl RunExport {
    pub fn new(summary: &RunSummary, results: &[TestResult]) -> Self {
        let run = &summary.run;
        let m = &summary.metrics;
        let c = &summary.cost;

        Self {
            id: run.id.clone(),
            name: run.name.clone(),
            status: run.status.clone(),
            created: run.created.clone(),
            updated: run.updated.clone(),
            config: RunConfigExport {
                embedding_model: run.embedding_model.clone(),
                embedding_key: run.embedding_key.clone(),
                enrichment_model: run.enrichment_model.clone(),
                tester_model: run.tester_model.clone(),
                tester_temperature: run.tester_temperature,
                difficulty_mode: run.difficulty_mode.clone(),
                target_query_count: run.target_query_count,
                completed_query_count: run.completed_query_count,
                use_sample_groups: run.use_sample_groups,
                use_dynamic_weights: run.use_dynamic_weights,
                weights: WeightsExport {
                    identity: run.mvs_weight_identity,
                    physical: run.mvs_weight_physical,
                    context: run.mvs_weight_context,
                },
            },
            metrics: MetricsExport {
                accuracy_at_1: m.accuracy_at_1,
                accuracy_at_5: m.accuracy_at_5,
                accuracy_at_10: m.accuracy_at_10,
                mean_reciprocal_rank: m.mean_reciprocal_rank,
                average_rank: m.average_rank,
                total_queries: m.total_queries,
                successful_queries: m.successful_queries,
                success_rate: m.success_rate(),
            },
            cost: CostExport {
                search_tokens: c.search_tokens,
                tester_tokens: c.tester_tokens,
                total_tokens: c.total_tokens,
                total_cost_usd: c.total_cost_usd,
                cost_per_query: c.cost_per_query,
            },
            results: results.iter().map(ResultExport::from).collect(),
        }
    }
}

impl From<&TestResult> for ResultExport {
    fn from(r: &TestResult) -> Self {
        Self {
            id: r.id.clone(),
            query: r.generated_query.clone(),
            source_group_id: r.source_group_id.clone(),
            source_group_name: r.source_group_name.clone(),
            correct_rank: r.correct_rank,
            query_intent: r.query_intent.clone(),
            search_tokens: r.search_tokens,
            tester_tokens: r.tester_tokens,
            similarity_margin: r.similarity_margin,
            applied_weights: r.applied_weights.clone(),
            top_results: r
                .top_results
                .iter()
                .take(TOP_RESULTS_PER_QUERY)
                .cloned()
                .collect(),
            created: r.created.clone(),
        }
    }
}

impl ExportDocument {
    pub fn new(exported_at: String, store_url: &str, test_runs: Vec<RunExport>) -> Self {
        Self {
            metadata: ExportMetadata {
                exported_at,
                total_runs: test_runs.len(),
                store_url: store_url.to_string(),
            },
            test_runs,
        }
    }

    pub fn total_results(&self) -> usize {
        self.test_runs.iter().map(|r| r.results.len()).sum()
    }

    /// Write the pretty and the compact rendition.
    pub fn write(&self, pretty_path: &Path, compact_path: &Path) -> Result<()> {
        write_report(pretty_path, &serde_json::to_string_pretty(self)?)?;
        write_report(compact_path, &serde_json::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;
    use crate::store::TestRun;
    use tempfile::TempDir;

    fn sample() -> ExportDocument {
        let run = TestRun {
            id: "r1".to_string(),
            name: "g25f_oai3l_gpt4o_mwM_#2".to_string(),
            mvs_weight_identity: 0.5,
            total_search_tokens: 1_000_000,
            ..TestRun::default()
        };
        let results = vec![
            TestResult {
                generated_query: Some("velvet curtain".to_string()),
                correct_rank: Some(2),
                top_results: (0..12)
                    .map(|i| TopResult {
                        id: Some(format!("g{}", i)),
                        name: None,
                        similarity: 0.9,
                    })
                    .collect(),
                ..TestResult::default()
            },
            TestResult::default(),
        ];
        let summary = RunSummary::new(run, &results, &PricingConfig::default());
        ExportDocument::new(
            "2025-01-01T00:00:00".to_string(),
            "http://localhost:8090",
            vec![RunExport::new(&summary, &results)],
        )
    }

    #[test]
    fn export_shape() {
        let doc = sample();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["metadata"]["total_runs"], 1);
        assert_eq!(value["metadata"]["pocketbase_url"], "http://localhost:8090");
        assert!(value["metadata"].get("store_url").is_none());
        let run = &value["test_runs"][0];
        assert_eq!(run["config"]["weights"]["identity"], 0.5);
        assert_eq!(run["metrics"]["success_rate"], 0.5);
        assert_eq!(run["metrics"]["mean_reciprocal_rank"], 0.25);
        assert_eq!(run["cost"]["total_cost_usd"], 0.02);
        assert_eq!(run["results"][0]["query"], "velvet curtain");
        assert_eq!(run["results"][0]["top_results"].as_array().unwrap().len(), 10);
        assert!(run["results"][1]["correct_rank"].is_null());
        assert_eq!(doc.total_results(), 2);
    }

    #[test]
    fn writes_pretty_and_compact() {
        let temp_dir = TempDir::new().unwrap();
        let pretty = temp_dir.path().join("export.json");
        let compact = temp_dir.path().join("export_compact.json");
        sample().write(&pretty, &compact).unwrap();

        let pretty_text = std::fs::read_to_string(&pretty).unwrap();
        let compact_text = std::fs::read_to_string(&compact).unwrap();
        assert!(pretty_text.contains('\n'));
        assert!(!compact_text.contains('\n'));
        let a: serde_json::Value = serde_json::from_str(&pretty_text).unwrap();
        let b: serde_json::Value = serde_json::from_str(&compact_text).unwrap();
        assert_eq!(a, b);
    }
}
