//! Upload completed test runs to Weights & Biases.

use clap::Parser;
use embedeval::eval::RunSummary;
use embedeval::insights::InsightsClient;
use embedeval::report::{markdown, write_report};
use embedeval::store::{PocketBaseClient, TestRun};
use embedeval::tracking::WandbExporter;
use embedeval::Config;

/// Export test runs to W&B, optionally with AI-generated insights.
#[derive(Parser, Debug)]
#[command(name = "export-wandb")]
struct Args {
    /// Export only this test run.
    #[arg(long)]
    test_id: Option<String>,

    /// Skip the insights call even when an API key is configured.
    #[arg(long)]
    no_insights: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load()?;

    println!("🚀 Exporting tests to W&B...\n");

    let exporter = WandbExporter::new(&config.tracking)?;
    let insights = if args.no_insights {
        None
    } else {
        InsightsClient::from_config(&config.insights)?
    };

    let client = PocketBaseClient::connect(&config.store).await?;
    println!("✅ Connected to {}\n", config.store.url);

    let runs: Vec<TestRun> = match &args.test_id {
        Some(id) => vec![client.test_run(id).await?],
        None => client.test_runs(config.store.runs_page_size).await?,
    };
    println!("📊 Found {} tests\n", runs.len());

    let total = runs.len();
    let mut uploaded = 0usize;
    for (i, run) in runs.into_iter().enumerate() {
        println!("[{}/{}] Processing: {}", i + 1, total, run.name);

        if !run.is_completed() {
            println!(
                "   ⏭️  Skipped (status: {})\n",
                run.status.as_deref().unwrap_or("unknown")
            );
            continue;
        }

        let results = match client.test_results(&run.id).await {
            Ok(results) => results,
            Err(e) => {
                log::error!("Failed to fetch results for {}: {}", run.id, e);
                println!("   ❌ Failed: {}\n", e);
                continue;
            }
        };
        let summary = RunSummary::new(run, &results, &config.pricing);

        let analysis = match &insights {
            Some(client) => match client.analyze(&summary).await {
                Ok(text) => {
                    let first_line = text.lines().next().unwrap_or_default();
                    println!("   💡 {}...", first_line.chars().take(80).collect::<String>());
                    Some(text)
                }
                Err(e) => {
                    log::warn!("Insights failed for {}: {}", summary.run.id, e);
                    None
                }
            },
            None => None,
        };

        if let Some(text) = &analysis {
            let id8: String = summary.run.id.chars().take(8).collect();
            let path = config.output_path(&format!("analysis-{}/insights.md", id8));
            match write_report(&path, &markdown::insights_report(&summary, text)) {
                Ok(()) => println!("   ✅ AI insights saved to {}", path.display()),
                Err(e) => println!("   ⚠️  Failed to save insights: {}", e),
            }
        }

        match exporter.upload(&summary, &results, analysis.as_deref()).await {
            Ok(run) => {
                uploaded += 1;
                println!(
                    "   ✅ Uploaded (Acc@1: {:.1}%, MRR: {:.3}, {} table rows)",
                    summary.metrics.accuracy_at_1 * 100.0,
                    summary.metrics.mean_reciprocal_rank,
                    run.logged_rows
                );
                if let Some(url) = run.url {
                    println!("   🔗 {}", url);
                }
            }
            Err(e) => {
                log::error!("Upload failed for {}: {}", summary.run.id, e);
                println!("   ❌ Failed: {}", e);
            }
        }
        println!();
    }

    println!("🎉 Done! Uploaded {} runs to project {}", uploaded, exporter.project());
    Ok(())
}
