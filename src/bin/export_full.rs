//! Complete markdown export of all valid test runs.

use clap::Parser;
use embedeval::eval::{RunFilter, RunSummary};
use embedeval::report::{markdown, write_report};
use embedeval::store::PocketBaseClient;
use embedeval::Config;

const EXPORT_FILE: &str = "full_test_data.md";

/// Export full test data to markdown, skipping runs in reports.excluded_runs.
#[derive(Parser, Debug)]
#[command(name = "export-full")]
struct Args {
    /// Maximum number of runs to fetch (default: store.runs_page_size).
    #[arg(long)]
    limit: Option<usize>,

    /// Additional exclusion pattern (repeatable).
    #[arg(long = "exclude")]
    exclude: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load()?;
    let client = PocketBaseClient::connect(&config.store).await?;

    println!("📦 Exporting full test data (excluding invalid tests)...\n");

    let runs = client
        .test_runs(args.limit.unwrap_or(config.store.runs_page_size))
        .await?;

    let mut patterns = config.reports.excluded_runs.clone();
    patterns.extend(args.exclude);
    let (valid, excluded) = RunFilter::new(&patterns).partition(runs);
    for run in &excluded {
        println!("⏭️  Skipping excluded test: {}", run.name);
    }
    println!(
        "✅ Found {} valid test runs (excluded {} invalid)\n",
        valid.len(),
        excluded.len()
    );

    let mut summaries = Vec::with_capacity(valid.len());
    let mut all_results = Vec::with_capacity(valid.len());
    for run in valid {
        let results = client.test_results(&run.id).await?;
        summaries.push(RunSummary::new(run, &results, &config.pricing));
        all_results.push(results);
    }

    let report = markdown::full_export_report(
        &summaries,
        &all_results,
        excluded.len(),
        &chrono::Local::now(),
    );
    let path = config.output_path(EXPORT_FILE);
    write_report(&path, &report)?;

    println!("✅ Full export saved to: {}", path.display());
    Ok(())
}
