//! Export every test run with its results to JSON (pretty and compact).

use clap::Parser;
use embedeval::eval::RunSummary;
use embedeval::report::json::{ExportDocument, RunExport};
use embedeval::store::PocketBaseClient;
use embedeval::Config;

const EXPORT_FILE: &str = "test_data_export.json";
const COMPACT_FILE: &str = "test_data_export_compact.json";

/// Export all test data to JSON.
#[derive(Parser, Debug)]
#[command(name = "export-json")]
struct Args {
    /// Maximum number of runs to fetch (default: store.runs_page_size).
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load()?;
    let client = PocketBaseClient::connect(&config.store).await?;

    println!("📦 Exporting test data to JSON...\n");

    let runs = client
        .test_runs(args.limit.unwrap_or(config.store.runs_page_size))
        .await?;
    println!("✅ Found {} test runs\n", runs.len());

    let total = runs.len();
    let mut exports = Vec::with_capacity(total);
    for (i, run) in runs.into_iter().enumerate() {
        println!("[{}/{}] {}", i + 1, total, run.name);
        let results = client.test_results(&run.id).await?;
        let summary = RunSummary::new(run, &results, &config.pricing);
        exports.push(RunExport::new(&summary, &results));
    }

    let document = ExportDocument::new(
        chrono::Local::now().to_rfc3339(),
        &config.store.url,
        exports,
    );
    let pretty = config.output_path(EXPORT_FILE);
    let compact = config.output_path(COMPACT_FILE);
    document.write(&pretty, &compact)?;

    println!(
        "\n✅ Exported {} runs, {} results",
        document.metadata.total_runs,
        document.total_results()
    );
    println!("   {}", pretty.display());
    println!("   {}", compact.display());
    Ok(())
}
