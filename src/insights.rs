//! Short natural-language assessment of a run via a chat-completion API.

use crate::config::InsightsConfig;
use crate::error::{EvalError, Result};
use crate::eval::models::{readable_name, ModelKind};
use crate::eval::summary::RunSummary;
use crate::report::percent;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat-completion client producing run insights
pub struct InsightsClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl InsightsClient {
    /// Build a client, or `None` when insights are disabled or no API key is set.
    pub fn from_config(config: &InsightsConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                log::debug!("{} not set, skipping insights", config.api_key_env);
                return Ok(None);
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }))
    }

    /// Ask for a rating, cost assessment and a one-line recommendation.
    pub async fn analyze(&self, summary: &RunSummary) -> Result<String> {
        let prompt = build_prompt(summary);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EvalError::Insights(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(EvalError::Insights(format!("API error {}: {}", status, body)));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| EvalError::Insights(format!("Failed to parse response: {}", e)))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| EvalError::Insights("Empty completion".to_string()))
    }
}

/// Prompt describing one run's configuration, metrics and cost.
pub fn build_prompt(summary: &RunSummary) -> String {
    let run = &summary.run;
    let m = &summary.metrics;
    format!(
        "Analyze this embedding test result concisely (max 150 words):

Configuration:
- Embedding Model: {}
- Enrichment: {}
- Tester: {}
- Queries: {}

Results:
- Accuracy@1: {}
- Accuracy@5: {}
- MRR: {:.3}
- Success Rate: {}
- Total Cost: ${:.4}
- Cost per Query: ${:.6}

Provide:
1. Performance rating (Excellent/Good/Fair/Poor)
2. Cost-efficiency assessment
3. One-line recommendation

Be direct and actionable.",
        readable_name(run.embedding_code(), ModelKind::Embedding),
        readable_name(run.enrichment_code(), ModelKind::Enrichment),
        readable_name(run.tester_code(), ModelKind::Tester),
        run.target_query_count,
        percent(m.accuracy_at_1, 1),
        percent(m.accuracy_at_5, 1),
        m.mean_reciprocal_rank,
        percent(m.success_rate(), 1),
        summary.cost.total_cost_usd,
        summary.cost.cost_per_query,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;
    use crate::store::{TestResult, TestRun};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summary() -> RunSummary {
        let run = TestRun {
            name: "g25f_oai3l_gpt4o_mwM_#2".to_string(),
            embedding_model: Some("oai3l".to_string()),
            target_query_count: 200,
            ..TestRun::default()
        };
        let results = vec![
            TestResult {
                correct_rank: Some(1),
                ..TestResult::default()
            },
            TestResult::default(),
        ];
        RunSummary::new(run, &results, &PricingConfig::default())
    }

    fn config(base_url: &str, key_env: &str) -> InsightsConfig {
        InsightsConfig {
            base_url: base_url.to_string(),
            api_key_env: key_env.to_string(),
            ..InsightsConfig::default()
        }
    }

    #[test]
    fn prompt_contains_run_details() {
        let prompt = build_prompt(&summary());
        assert!(prompt.contains("- Embedding Model: OpenAI text-embedding-3-large"));
        assert!(prompt.contains("- Enrichment: No Enrichment"));
        assert!(prompt.contains("- Queries: 200"));
        assert!(prompt.contains("- Accuracy@1: 50.0%"));
        assert!(prompt.contains("- Success Rate: 50.0%"));
    }

    #[test]
    fn disabled_without_key_or_flag() {
        let missing = config("https://api.openai.com/v1", "EMBEDEVAL_TEST_NO_SUCH_KEY");
        assert!(InsightsClient::from_config(&missing).unwrap().is_none());

        std::env::set_var("EMBEDEVAL_TEST_INSIGHTS_KEY_OFF", "sk-test");
        let off = InsightsConfig {
            enabled: false,
            ..config("https://api.openai.com/v1", "EMBEDEVAL_TEST_INSIGHTS_KEY_OFF")
        };
        assert!(InsightsClient::from_config(&off).unwrap().is_none());
    }

    #[tokio::test]
    async fn analyze_returns_trimmed_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "  Good. Cheap. Keep it.\n" }
                }]
            })))
            .mount(&server)
            .await;

        std::env::set_var("EMBEDEVAL_TEST_INSIGHTS_KEY", "sk-test");
        let client =
            InsightsClient::from_config(&config(&server.uri(), "EMBEDEVAL_TEST_INSIGHTS_KEY"))
                .unwrap()
                .unwrap();
        let text = client.analyze(&summary()).await.unwrap();
        assert_eq!(text, "Good. Cheap. Keep it.");
    }

    #[tokio::test]
    async fn analyze_maps_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        std::env::set_var("EMBEDEVAL_TEST_INSIGHTS_KEY_ERR", "sk-test");
        let client =
            InsightsClient::from_config(&config(&server.uri(), "EMBEDEVAL_TEST_INSIGHTS_KEY_ERR"))
                .unwrap()
                .unwrap();
        let err = client.analyze(&summary()).await.unwrap_err();
        assert!(matches!(err, EvalError::Insights(_)));
        assert!(err.to_string().contains("429"));
    }
}
