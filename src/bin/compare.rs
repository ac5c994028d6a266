//! Markdown comparison report over all completed test runs.

use clap::Parser;
use embedeval::eval::{rank_by_accuracy, RunSummary};
use embedeval::report::{markdown, write_report};
use embedeval::store::PocketBaseClient;
use embedeval::Config;

const REPORT_FILE: &str = "comparison_report.md";
const PREVIEW_LINES: usize = 30;

/// Compare completed test runs and write a markdown report.
#[derive(Parser, Debug)]
#[command(name = "compare")]
struct Args {
    /// Maximum number of runs to fetch (default: store.runs_page_size).
    #[arg(long)]
    limit: Option<usize>,

    /// Skip the terminal preview.
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load()?;
    let client = PocketBaseClient::connect(&config.store).await?;

    println!("📊 Generating Comparison Report...\n");

    let runs = client
        .test_runs(args.limit.unwrap_or(config.store.runs_page_size))
        .await?;
    let completed: Vec<_> = runs.into_iter().filter(|r| r.is_completed()).collect();
    println!("✅ Found {} completed tests\n", completed.len());

    let mut summaries = Vec::with_capacity(completed.len());
    for run in completed {
        let results = client.test_results(&run.id).await?;
        log::debug!("{}: {} results", run.name, results.len());
        summaries.push(RunSummary::new(run, &results, &config.pricing));
    }
    rank_by_accuracy(&mut summaries);

    let report = markdown::comparison_report(&summaries, &chrono::Local::now());
    let path = config.output_path(REPORT_FILE);
    write_report(&path, &report)?;

    println!("✅ Report saved to: {}\n", path.display());
    if !args.quiet {
        println!("Preview:\n");
        for line in report.lines().take(PREVIEW_LINES) {
            println!("{}", line);
        }
    }

    Ok(())
}
