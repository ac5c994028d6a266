use crate::config::StoreConfig;
use crate::error::{EvalError, Result};
use crate::store::types::{Group, ListResponse, TestResult, TestRun};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const RUNS_COLLECTION: &str = "embedding_test_runs";
const RESULTS_COLLECTION: &str = "embedding_test_results";
const GROUPS_COLLECTION: &str = "groups";

/// Request body for superuser password authentication
#[derive(Serialize)]
struct AuthRequest<'a> {
    identity: &'a str,
    password: &'a str,
}

/// Response from the auth endpoint; only the token is used
#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

/// Authenticated client for the results store (PocketBase REST API)
///
/// Authenticates once as a superuser on connect and reuses the token for
/// every collection query.
pub struct PocketBaseClient {
    client: Client,
    base_url: String,
    token: String,
    results_page_size: usize,
}

impl PocketBaseClient {
    /// Authenticate with the credentials named in the store config
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let credentials = config.credentials()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = config.url.trim_end_matches('/').to_string();

        log::info!("Connecting to results store at {}", base_url);

        let response = client
            .post(format!(
                "{}/api/collections/_superusers/auth-with-password",
                base_url
            ))
            .json(&AuthRequest {
                identity: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(EvalError::Auth(format!("{}: {}", status, body)));
        }

        let auth: AuthResponse = response.json().await?;
        log::debug!("Authenticated as {}", credentials.email);

        Ok(Self {
            client,
            base_url,
            token: auth.token,
            results_page_size: config.results_page_size,
        })
    }

    /// Fetch up to `limit` test runs
    pub async fn test_runs(&self, limit: usize) -> Result<Vec<TestRun>> {
        let runs: Vec<TestRun> = self
            .list(RUNS_COLLECTION, &[("perPage", limit.to_string())])
            .await?;
        log::debug!("Fetched {} test runs", runs.len());
        Ok(runs)
    }

    /// Fetch a single test run by id
    pub async fn test_run(&self, run_id: &str) -> Result<TestRun> {
        check_record_id(run_id)?;
        let url = format!(
            "{}/api/collections/{}/records/{}",
            self.base_url, RUNS_COLLECTION, run_id
        );
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        Self::decode(response).await
    }

    /// Fetch the results recorded for one run
    pub async fn test_results(&self, run_id: &str) -> Result<Vec<TestResult>> {
        check_record_id(run_id)?;
        let results: Vec<TestResult> = self
            .list(
                RESULTS_COLLECTION,
                &[
                    ("filter", format!("run_id=\"{}\"", run_id)),
                    ("perPage", self.results_page_size.to_string()),
                ],
            )
            .await?;
        log::debug!("Fetched {} results for run {}", results.len(), run_id);
        Ok(results)
    }

    /// Fetch up to `limit` groups that carry at least one embedding
    pub async fn groups_with_embeddings(&self, limit: usize) -> Result<Vec<Group>> {
        self.list(
            GROUPS_COLLECTION,
            &[
                ("perPage", limit.to_string()),
                ("filter", "embeddings != null".to_string()),
            ],
        )
        .await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = format!("{}/api/collections/{}/records", self.base_url, collection);
        let response = self
            .client
            .get(url)
            .query(params)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let page: ListResponse<T> = Self::decode(response).await?;
        Ok(page.items)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().path().to_string();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(EvalError::Store(format!("{} {}: {}", status, url, body)));
        }
        Ok(response.json().await?)
    }
}

/// Record ids are interpolated into paths and filter expressions, so only
/// PocketBase's id alphabet is accepted.
fn check_record_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(EvalError::InvalidInput(format!("invalid record id '{}'", id)))
    }
}
