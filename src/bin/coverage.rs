//! Embedding coverage per key across all groups.

use clap::Parser;
use embedeval::eval::coverage::EmbeddingCoverage;
use embedeval::report::text;
use embedeval::store::PocketBaseClient;
use embedeval::Config;

/// Check how many groups carry embeddings for each key.
#[derive(Parser, Debug)]
#[command(name = "coverage")]
struct Args {
    /// Embedding key to verify.
    #[arg(long, default_value = "g25f_oai3l")]
    key: String,

    /// Maximum number of groups to fetch.
    #[arg(long, default_value_t = 500)]
    limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load()?;
    let client = PocketBaseClient::connect(&config.store).await?;

    println!("🔍 Checking embedding coverage...\n");

    let groups = client.groups_with_embeddings(args.limit).await?;
    let coverage = EmbeddingCoverage::from_groups(&groups);
    print!("{}", text::coverage_table(&coverage, &args.key));

    Ok(())
}
