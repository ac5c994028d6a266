use anyhow::{Context, Result};
use embedeval::store::{PocketBaseClient, TestResult};
use embedeval::{compute_metrics, Config};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so metrics JSON on stdout stays clean
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "metrics" => {
            let path = args
                .get(2)
                .context("Usage: embedeval metrics <results.json>")?;
            run_offline_metrics(Path::new(path))?;
        }
        "verify" => {
            run_store_verification().await?;
        }
        other => {
            anyhow::bail!(
                "Unknown command '{}'. Expected 'verify' or 'metrics <results.json>'",
                other
            );
        }
    }

    Ok(())
}

/// Aggregate a JSON array of result records without touching the store.
fn run_offline_metrics(path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let results: Vec<TestResult> = serde_json::from_str(&json)
        .with_context(|| format!("Invalid results JSON in {}", path.display()))?;

    log::info!("Aggregating {} result records", results.len());
    let metrics = compute_metrics(&results);
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

/// Authenticate against the results store and report what it holds.
async fn run_store_verification() -> Result<()> {
    let config = Config::load()?;
    let client = PocketBaseClient::connect(&config.store).await?;
    let runs = client.test_runs(config.store.runs_page_size).await?;
    let completed = runs.iter().filter(|r| r.is_completed()).count();

    println!("✓ Connected to {}", config.store.url);
    println!("✓ {} test runs ({} completed)", runs.len(), completed);
    Ok(())
}
