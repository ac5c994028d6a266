use crate::config::TrackingConfig;
use crate::error::{EvalError, Result};
use crate::eval::models::{readable_name, ModelKind};
use crate::eval::analysis::display_rank;
use crate::eval::summary::RunSummary;
use crate::store::TestResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Rows of the `query_results` table logged per run.
pub const TABLE_ROW_LIMIT: usize = 100;

const UPSERT_BUCKET: &str = r#"
mutation UpsertBucket(
    $id: String, $name: String, $project: String, $entity: String,
    $displayName: String, $config: JSONString, $summaryMetrics: JSONString,
    $tags: [String!], $state: String
) {
    upsertBucket(input: {
        id: $id, name: $name, modelName: $project, entityName: $entity,
        displayName: $displayName, config: $config, summaryMetrics: $summaryMetrics,
        tags: $tags, state: $state
    }) {
        bucket { id name displayName project { name entity { name } } }
        inserted
    }
}
"#;

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<UpsertData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertData {
    upsert_bucket: Option<UpsertBucketPayload>,
}

#[derive(Deserialize)]
struct UpsertBucketPayload {
    bucket: Bucket,
    #[serde(default)]
    inserted: bool,
}

#[derive(Deserialize)]
struct Bucket {
    id: String,
    name: String,
    project: Option<BucketProject>,
}

#[derive(Deserialize)]
struct BucketProject {
    name: String,
    entity: Option<BucketEntity>,
}

#[derive(Deserialize)]
struct BucketEntity {
    name: String,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedRun {
    pub bucket_id: String,
    /// True when the run did not exist yet
    pub inserted: bool,
    /// Rows written to the `query_results` table
    pub logged_rows: usize,
    /// Browser URL, when the entity is known
    pub url: Option<String>,
}

/// Weights & Biases exporter
///
/// Creates or updates one W&B run per test run through the GraphQL API. The
/// test run id is used as the W&B run name, so re-exporting updates in place.
pub struct WandbExporter {
    client: Client,
    base_url: String,
    api_key: String,
    project: String,
    entity: Option<String>,
}

impl WandbExporter {
    pub fn new(config: &TrackingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                EvalError::Config(format!(
                    "Environment variable {} not set. \
                     Set it in .env.local or as an environment variable.",
                    config.api_key_env
                ))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            project: config.project.clone(),
            entity: config.entity.clone(),
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Upload config, summary metrics and tags for one run, then stream the
    /// `query_results` table into the run history.
    pub async fn upload(
        &self,
        summary: &RunSummary,
        results: &[TestResult],
        insights: Option<&str>,
    ) -> Result<UploadedRun> {
        let variables = json!({
            "name": summary.run.id,
            "project": self.project,
            "entity": self.entity,
            "displayName": summary.run.name,
            "config": run_config(summary).to_string(),
            "summaryMetrics": summary_metrics(summary, insights).to_string(),
            "tags": run_tags(summary),
            "state": "finished",
        });

        let response = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .header("Authorization", self.basic_auth())
            .json(&GraphqlRequest {
                query: UPSERT_BUCKET,
                variables,
            })
            .send()
            .await?;
        let response = check_status(response).await?;

        let reply: GraphqlResponse = response.json().await?;
        if !reply.errors.is_empty() {
            let messages: Vec<String> = reply.errors.into_iter().map(|e| e.message).collect();
            return Err(EvalError::Tracking(messages.join("; ")));
        }

        let payload = reply
            .data
            .and_then(|d| d.upsert_bucket)
            .ok_or_else(|| EvalError::Tracking("upsertBucket returned no bucket".to_string()))?;

        log::debug!(
            "Upserted W&B run {} ({})",
            payload.bucket.id,
            if payload.inserted { "created" } else { "updated" }
        );

        let project = payload
            .bucket
            .project
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| self.project.clone());
        let entity = payload
            .bucket
            .project
            .as_ref()
            .and_then(|p| p.entity.as_ref())
            .map(|e| e.name.clone())
            .or_else(|| self.entity.clone());

        let mut logged_rows = 0;
        match &entity {
            Some(entity) if !results.is_empty() => {
                let table = query_results_table(results);
                logged_rows = table.data.len();
                self.stream_history(entity, &project, &payload.bucket.name, &table)
                    .await?;
            }
            Some(_) => {}
            None => log::warn!(
                "W&B entity unknown for run {}, query_results table not logged",
                payload.bucket.name
            ),
        }

        let url = entity.map(|entity| {
            format!("https://wandb.ai/{}/{}/runs/{}", entity, project, payload.bucket.name)
        });

        Ok(UploadedRun {
            bucket_id: payload.bucket.id,
            inserted: payload.inserted,
            logged_rows,
            url,
        })
    }

    /// Append one history step holding the table through the file-stream API.
    async fn stream_history(
        &self,
        entity: &str,
        project: &str,
        run_name: &str,
        table: &QueryResultsTable,
    ) -> Result<()> {
        let step = json!({ "_step": 0, "query_results": table });
        let body = json!({
            "files": {
                "wandb-history.jsonl": { "offset": 0, "content": [step.to_string()] }
            },
            "complete": true,
            "exitcode": 0,
        });

        let response = self
            .client
            .post(format!(
                "{}/files/{}/{}/{}/file_stream",
                self.base_url, entity, project, run_name
            ))
            .header("Authorization", self.basic_auth())
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;

        log::debug!("Streamed {} query rows to {}", table.data.len(), run_name);
        Ok(())
    }

    fn basic_auth(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("api:{}", self.api_key)))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(EvalError::Tracking(format!("W&B API error {}: {}", status, body)))
}

/// W&B table in its `{"_type": "table", columns, data}` history encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResultsTable {
    #[serde(rename = "_type")]
    kind: &'static str,
    pub columns: [&'static str; 5],
    pub data: Vec<(String, String, i64, String, f64)>,
}

/// First [`TABLE_ROW_LIMIT`] results as query, source group, rank, top result
/// name and its similarity.
pub fn query_results_table(results: &[TestResult]) -> QueryResultsTable {
    let data = results
        .iter()
        .take(TABLE_ROW_LIMIT)
        .map(|r| {
            let top = r.top_result();
            (
                r.generated_query.clone().unwrap_or_default(),
                r.source_group_name.clone().unwrap_or_default(),
                display_rank(r),
                top.and_then(|t| t.name.clone()).unwrap_or_default(),
                top.map(|t| t.similarity).unwrap_or(0.0),
            )
        })
        .collect();

    QueryResultsTable {
        kind: "table",
        columns: ["query", "source_group", "rank", "top_result", "similarity"],
        data,
    }
}

/// Run configuration in W&B's `{"key": {"value": ...}}` layout.
pub fn run_config(summary: &RunSummary) -> Value {
    let run = &summary.run;
    let plain = json!({
        "embedding_model_code": run.embedding_code(),
        "enrichment_model_code": run.enrichment_code(),
        "tester_model_code": run.tester_code(),
        "embedding_model": readable_name(run.embedding_code(), ModelKind::Embedding),
        "enrichment_model": readable_name(run.enrichment_code(), ModelKind::Enrichment),
        "tester_model": readable_name(run.tester_code(), ModelKind::Tester),
        "target_query_count": run.target_query_count,
        "difficulty_mode": run.difficulty(),
        "mvs_weight_identity": run.mvs_weight_identity,
        "mvs_weight_physical": run.mvs_weight_physical,
        "mvs_weight_context": run.mvs_weight_context,
        "use_dynamic_weights": run.use_dynamic_weights,
    });

    let mut wrapped = Map::new();
    if let Value::Object(fields) = plain {
        for (key, value) in fields {
            wrapped.insert(key, json!({ "value": value }));
        }
    }
    Value::Object(wrapped)
}

/// Final summary metrics: ranking quality, success rate, tokens and cost.
pub fn summary_metrics(summary: &RunSummary, insights: Option<&str>) -> Value {
    let m = &summary.metrics;
    let c = &summary.cost;
    let mut metrics = json!({
        "accuracy_at_1": m.accuracy_at_1,
        "accuracy_at_5": m.accuracy_at_5,
        "accuracy_at_10": m.accuracy_at_10,
        "mean_reciprocal_rank": m.mean_reciprocal_rank,
        "average_rank": m.average_rank,
        "success_rate": m.success_rate(),
        "total_queries": m.total_queries,
        "successful_queries": m.successful_queries,
        "total_search_tokens": c.search_tokens,
        "total_tester_tokens": c.tester_tokens,
        "total_tokens": c.total_tokens,
        "total_cost_usd": c.total_cost_usd,
        "cost_per_query": c.cost_per_query,
    });
    if let (Some(text), Value::Object(fields)) = (insights, &mut metrics) {
        fields.insert("ai_insights".to_string(), Value::String(text.to_string()));
    }
    metrics
}

/// Tags for grouping in the W&B UI; empty values are dropped.
pub fn run_tags(summary: &RunSummary) -> Vec<String> {
    let run = &summary.run;
    [
        run.embedding_model.as_deref(),
        run.enrichment_model.as_deref(),
        Some(run.difficulty()),
        Some(run.status.as_deref().unwrap_or("completed")),
    ]
    .into_iter()
    .flatten()
    .filter(|tag| !tag.is_empty())
    .map(String::from)
    .collect()
}
