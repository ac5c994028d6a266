//! Query consistency analysis between a reference run and the other runs.

use clap::Parser;
use embedeval::eval::analysis::{unique_queries, QueryOverlap};
use embedeval::eval::RunSummary;
use embedeval::report::{text, write_report};
use embedeval::store::{PocketBaseClient, TestRun};
use embedeval::Config;

const ANALYSIS_FILE: &str = "query_analysis.txt";
const MIN_TARGET_QUERIES: u64 = 100;
const SAMPLE_QUERIES: usize = 20;
const OVERLAP_RUNS: usize = 3;

/// Compare the queries of one run against other completed runs.
#[derive(Parser, Debug)]
#[command(name = "analyze")]
struct Args {
    /// Name fragment of the reference run.
    #[arg(long, default_value = "g25f_oai3l")]
    target: String,

    /// Name fragment of a similar run to sample side by side.
    #[arg(long, default_value = "oai3l")]
    similar: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load()?;
    let client = PocketBaseClient::connect(&config.store).await?;

    println!("🔍 Analyzing test queries...\n");

    let runs = client.test_runs(config.store.runs_page_size).await?;
    let completed: Vec<TestRun> = runs
        .into_iter()
        .filter(|r| r.is_completed() && r.target_query_count > MIN_TARGET_QUERIES)
        .collect();
    println!(
        "✅ Found {} completed tests (>{} queries)\n",
        completed.len(),
        MIN_TARGET_QUERIES
    );

    let Some(reference) = completed.iter().find(|r| r.name.contains(&args.target)) else {
        anyhow::bail!("Could not find a completed run matching '{}'", args.target);
    };
    println!("🎯 Analyzing: {}\n", reference.name);

    let reference_results = client.test_results(&reference.id).await?;
    let reference_summary = RunSummary::new(reference.clone(), &reference_results, &config.pricing);
    println!("{}\n", text::run_stats(&reference_summary));

    println!("{}", text::banner("COMPARISON WITH OTHER TESTS"));
    let mut others = Vec::new();
    for run in completed.iter().filter(|r| r.id != reference.id) {
        let results = client.test_results(&run.id).await?;
        others.push((RunSummary::new(run.clone(), &results, &config.pricing), results));
    }
    let other_summaries: Vec<RunSummary> = others.iter().map(|(s, _)| s.clone()).collect();
    println!("{}", text::comparison_lines(&other_summaries));

    println!("{}", text::banner("SAMPLE QUERIES COMPARISON"));
    println!(
        "\n📝 Sample queries from {} (first {}):\n",
        reference.name, SAMPLE_QUERIES
    );
    print!("{}", text::sample_queries(&reference_results, SAMPLE_QUERIES));

    println!("\n{}", text::banner("COMPARISON WITH SIMILAR TEST"));
    match others.iter().find(|(s, _)| s.run.name.contains(&args.similar)) {
        Some((similar, results)) => {
            println!(
                "\n📝 Sample queries from {} (first {}):\n",
                similar.run.name, SAMPLE_QUERIES
            );
            print!("{}", text::sample_queries(results, SAMPLE_QUERIES));
        }
        None => println!("\nNo other run matching '{}'", args.similar),
    }

    println!("\n{}", text::banner("QUERY OVERLAP ANALYSIS"));
    let overlaps: Vec<(String, QueryOverlap)> = completed
        .iter()
        .take(OVERLAP_RUNS)
        .filter_map(|run| others.iter().find(|(s, _)| s.run.id == run.id))
        .map(|(s, results)| {
            (s.run.name.clone(), QueryOverlap::between(&reference_results, results))
        })
        .collect();
    if overlaps.is_empty() {
        println!(
            "\n{}: {} unique queries",
            reference.name,
            unique_queries(&reference_results).len()
        );
    } else {
        print!("\n{}", text::overlap_lines(&reference.name, &overlaps));
    }

    println!("\n{}", text::banner("CONFIGURATION VERIFICATION"));
    println!("\n{}", text::configuration_block(reference));
    println!("\n{}", text::potential_issues(&args.target));

    let path = config.output_path(ANALYSIS_FILE);
    write_report(&path, &text::analysis_file(&reference_summary, &reference_results))?;
    println!("\n✅ Detailed report saved to: {}", path.display());

    Ok(())
}
