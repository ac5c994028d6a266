//! Record types for the embedding-test collections in the results store.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Paged list envelope returned by the store's `records` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// One experiment run: a configuration evaluated over a batch of generated queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRun {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_key: Option<String>,
    pub enrichment_model: Option<String>,
    pub tester_model: Option<String>,
    pub tester_temperature: Option<f64>,
    pub difficulty_mode: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub target_query_count: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub completed_query_count: u64,
    pub use_sample_groups: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub use_dynamic_weights: bool,
    #[serde(deserialize_with = "lenient_f64")]
    pub mvs_weight_identity: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub mvs_weight_physical: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub mvs_weight_context: f64,
    #[serde(deserialize_with = "lenient_u64")]
    pub total_search_tokens: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub total_tester_tokens: u64,
}

impl TestRun {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("completed")
    }

    /// Embedding model code, `unknown` when unset or empty.
    pub fn embedding_code(&self) -> &str {
        non_empty(self.embedding_model.as_deref()).unwrap_or("unknown")
    }

    /// Enrichment model code, `none` when unset or empty.
    pub fn enrichment_code(&self) -> &str {
        non_empty(self.enrichment_model.as_deref()).unwrap_or("none")
    }

    /// Tester model code, `unknown` when unset or empty.
    pub fn tester_code(&self) -> &str {
        non_empty(self.tester_model.as_deref()).unwrap_or("unknown")
    }

    /// Difficulty mode, `medium` when unset or empty.
    pub fn difficulty(&self) -> &str {
        non_empty(self.difficulty_mode.as_deref()).unwrap_or("medium")
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_search_tokens + self.total_tester_tokens
    }
}

/// One retrieval candidate returned for a generated query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopResult {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub similarity: f64,
}

/// One evaluated query within a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestResult {
    pub id: Option<String>,
    pub run_id: Option<String>,
    #[serde(alias = "query_text")]
    pub generated_query: Option<String>,
    pub source_group_id: Option<String>,
    pub source_group_name: Option<String>,
    /// 1-based rank of the source group in the search results. Anything that is
    /// not an integral number (null, text, fractional) deserializes to `None`.
    #[serde(deserialize_with = "lenient_rank")]
    pub correct_rank: Option<i64>,
    pub query_intent: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub search_tokens: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub tester_tokens: u64,
    pub similarity_margin: Option<f64>,
    pub applied_weights: Option<serde_json::Value>,
    #[serde(deserialize_with = "lenient_top_results")]
    pub top_results: Vec<TopResult>,
    pub created: Option<String>,
}

impl TestResult {
    /// First returned candidate, if any.
    pub fn top_result(&self) -> Option<&TopResult> {
        self.top_results.first()
    }

    pub fn query(&self) -> &str {
        self.generated_query.as_deref().unwrap_or("N/A")
    }

    pub fn source_name(&self) -> &str {
        self.source_group_name.as_deref().unwrap_or("N/A")
    }
}

/// A group record; only its embedding keys matter here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: String,
    pub name: Option<String>,
    pub embeddings: Option<HashMap<String, serde_json::Value>>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Integral JSON numbers only; everything else is "no rank".
fn lenient_rank<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)))
        .unwrap_or(0))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).unwrap_or(0.0))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
}

fn lenient_top_results<'de, D>(deserializer: D) -> Result<Vec<TopResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
