//! Markdown reports: cross-run comparison and the full data export.

use crate::eval::analysis::{display_rank, failed_queries};
use crate::eval::models::{
    readable_name, short_embedding_name, short_enrichment_name, truncate_chars, ModelKind,
    EMBEDDING_PROVIDERS,
};
use crate::eval::summary::{BestPerformers, RunSummary};
use crate::report::{percent, thousands};
use crate::store::{TestResult, TestRun};
use chrono::{DateTime, TimeZone};
use std::fmt::{self, Write};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SAMPLE_RESULTS: usize = 10;
const LISTED_FAILURES: usize = 5;

/// Comparison report over summaries already ranked by the caller.
pub fn comparison_report<Tz>(summaries: &[RunSummary], generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut md = String::new();
    // Writing into a String cannot fail.
    let _ = write_comparison(&mut md, summaries, generated_at);
    md
}

/// Full export: one section per run with its sample results and failures.
///
/// `results` is parallel to `summaries`. `excluded` only feeds the header count.
pub fn full_export_report<Tz>(
    summaries: &[RunSummary],
    results: &[Vec<TestResult>],
    excluded: usize,
    generated_at: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut md = String::new();
    let _ = write_full_export(&mut md, summaries, results, excluded, generated_at);
    md
}

/// Insights note for one run: configuration, headline metrics and the text.
pub fn insights_report(summary: &RunSummary, insights: &str) -> String {
    let run = &summary.run;
    let mut md = String::new();
    let _ = writeln!(md, "# AI Analysis: {}\n", run.name);
    let _ = writeln!(
        md,
        "**Embedding:** {}",
        readable_name(run.embedding_code(), ModelKind::Embedding)
    );
    let _ = writeln!(
        md,
        "**Enrichment:** {}",
        readable_name(run.enrichment_code(), ModelKind::Enrichment)
    );
    let _ = writeln!(
        md,
        "**Tester:** {}\n",
        readable_name(run.tester_code(), ModelKind::Tester)
    );
    let _ = writeln!(md, "## Metrics\n");
    let _ = writeln!(md, "- Accuracy@1: {}", percent(summary.metrics.accuracy_at_1, 1));
    let _ = writeln!(md, "- MRR: {:.3}", summary.metrics.mean_reciprocal_rank);
    let _ = writeln!(md, "- Cost: ${:.4}\n", summary.cost.total_cost_usd);
    let _ = writeln!(md, "## AI Insights\n");
    md.push_str(insights);
    md
}

fn write_comparison<Tz>(
    md: &mut String,
    summaries: &[RunSummary],
    generated_at: &DateTime<Tz>,
) -> fmt::Result
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    writeln!(md, "# Embedding Tests - Comparison Report\n")?;
    writeln!(md, "**Generated:** {}\n", generated_at.format(TIMESTAMP_FORMAT))?;
    writeln!(md, "**Total Tests:** {}\n", summaries.len())?;

    writeln!(md, "## 📊 Summary Table\n")?;
    writeln!(md, "| Rank | Name | Embedding | Enrichment | Acc@1 | Acc@5 | MRR | Cost | Cost/Q |")?;
    writeln!(md, "|------|------|-----------|------------|-------|-------|-----|------|--------|")?;
    for (i, s) in summaries.iter().enumerate() {
        writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | {:.3} | ${:.4} | ${:.6} |",
            i + 1,
            truncate_chars(&s.run.name, 20),
            short_embedding_name(s.run.embedding_code()),
            short_enrichment_name(s.run.enrichment_code()),
            percent(s.metrics.accuracy_at_1, 1),
            percent(s.metrics.accuracy_at_5, 1),
            s.metrics.mean_reciprocal_rank,
            s.cost.total_cost_usd,
            s.cost.cost_per_query,
        )?;
    }

    if let Some(best) = BestPerformers::find(summaries) {
        write_best_performers(md, summaries, &best)?;
    }

    writeln!(md, "## 📋 Detailed Breakdown\n")?;
    for (i, s) in summaries.iter().enumerate() {
        let run = &s.run;
        writeln!(md, "### {}. {}\n", i + 1, run.name)?;
        writeln!(md, "**Configuration:**")?;
        writeln!(
            md,
            "- Embedding: {}",
            readable_name(run.embedding_code(), ModelKind::Embedding)
        )?;
        writeln!(
            md,
            "- Enrichment: {}",
            readable_name(run.enrichment_code(), ModelKind::Enrichment)
        )?;
        writeln!(md, "- Tester: {}", readable_name(run.tester_code(), ModelKind::Tester))?;
        writeln!(md, "- Queries: {}\n", run.target_query_count)?;

        writeln!(md, "**Metrics:**")?;
        writeln!(md, "- Accuracy@1: **{}**", percent(s.metrics.accuracy_at_1, 1))?;
        writeln!(md, "- Accuracy@5: {}", percent(s.metrics.accuracy_at_5, 1))?;
        writeln!(md, "- Accuracy@10: {}", percent(s.metrics.accuracy_at_10, 1))?;
        writeln!(md, "- MRR: {:.3}", s.metrics.mean_reciprocal_rank)?;
        writeln!(md, "- Avg Rank: {:.2}", s.metrics.average_rank)?;
        if s.metrics.total_queries > 0 {
            writeln!(md, "- Success Rate: {}\n", percent(s.metrics.success_rate(), 1))?;
        } else {
            writeln!(md, "- Success Rate: N/A\n")?;
        }

        writeln!(md, "**Cost:**")?;
        writeln!(md, "- Total: ${:.4}", s.cost.total_cost_usd)?;
        writeln!(md, "- Per Query: ${:.6}", s.cost.cost_per_query)?;
        writeln!(md, "- Tokens: {}\n", thousands(s.cost.total_tokens))?;
        writeln!(md, "---\n")?;
    }

    Ok(())
}

fn write_best_performers(
    md: &mut String,
    summaries: &[RunSummary],
    best: &BestPerformers,
) -> fmt::Result {
    writeln!(md, "\n## 🏆 Best Performers\n")?;

    let acc = &summaries[best.accuracy];
    writeln!(md, "### 🎯 Best Accuracy@1")?;
    writeln!(md, "**{}** - {}\n", acc.run.name, percent(acc.metrics.accuracy_at_1, 1))?;

    let mrr = &summaries[best.mrr];
    writeln!(md, "### 📈 Best MRR")?;
    writeln!(md, "**{}** - {:.3}\n", mrr.run.name, mrr.metrics.mean_reciprocal_rank)?;

    let cheap = &summaries[best.lowest_cost];
    writeln!(md, "### 💰 Lowest Cost")?;
    writeln!(md, "**{}** - ${:.4}\n", cheap.run.name, cheap.cost.total_cost_usd)?;

    writeln!(md, "### ⭐ Best Value (Acc/Cost)")?;
    match best.value {
        Some(i) => {
            let value = &summaries[i];
            writeln!(
                md,
                "**{}** - {} @ ${:.6}/query\n",
                value.run.name,
                percent(value.metrics.accuracy_at_1, 1),
                value.cost.cost_per_query
            )?;
        }
        None => writeln!(md, "No run above 50% Accuracy@1\n")?,
    }

    Ok(())
}

fn write_full_export<Tz>(
    md: &mut String,
    summaries: &[RunSummary],
    results: &[Vec<TestResult>],
    excluded: usize,
    generated_at: &DateTime<Tz>,
) -> fmt::Result
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    writeln!(md, "# Embedding Tests - Complete Data Export\n")?;
    writeln!(md, "**Generated:** {}\n", generated_at.format(TIMESTAMP_FORMAT))?;
    writeln!(md, "**Total Valid Test Runs:** {}", summaries.len())?;
    writeln!(md, "**Excluded Invalid Tests:** {}\n", excluded)?;
    writeln!(md, "---\n")?;

    writeln!(md, "## 📊 Quick Summary\n")?;
    writeln!(md, "| # | Name | Status | Embedding | Enrichment | Queries | Acc@1 | MRR | Cost |")?;
    writeln!(md, "|---|------|--------|-----------|------------|---------|-------|-----|------|")?;
    for (i, s) in summaries.iter().enumerate() {
        let run = &s.run;
        writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | {} | {:.3} | ${:.4} |",
            i + 1,
            truncate_chars(&run.name, 25),
            run.status.as_deref().unwrap_or("unknown"),
            truncate_chars(readable_name(run.embedding_code(), ModelKind::Embedding), 15),
            truncate_chars(readable_name(run.enrichment_code(), ModelKind::Enrichment), 12),
            run.target_query_count,
            percent(s.metrics.accuracy_at_1, 1),
            s.metrics.mean_reciprocal_rank,
            s.cost.total_cost_usd,
        )?;
    }
    writeln!(md, "\n---\n")?;

    writeln!(md, "## 📋 Detailed Test Data\n")?;
    for (i, s) in summaries.iter().enumerate() {
        let run_results = results.get(i).map(Vec::as_slice).unwrap_or(&[]);
        write_run_section(md, i + 1, s, run_results)?;
    }

    write_appendix(md)
}

fn write_run_section(
    md: &mut String,
    index: usize,
    s: &RunSummary,
    results: &[TestResult],
) -> fmt::Result {
    let run = &s.run;
    let m = &s.metrics;

    writeln!(md, "### Test {}: {}\n", index, run.name)?;
    write_run_configuration(md, run)?;

    writeln!(md, "**Weights:**")?;
    writeln!(md, "- Identity: {}", run.mvs_weight_identity)?;
    writeln!(md, "- Physical: {}", run.mvs_weight_physical)?;
    writeln!(md, "- Context: {}\n", run.mvs_weight_context)?;

    writeln!(md, "**Metrics:**")?;
    writeln!(md, "- Accuracy@1: **{}**", percent(m.accuracy_at_1, 2))?;
    writeln!(md, "- Accuracy@5: {}", percent(m.accuracy_at_5, 2))?;
    writeln!(md, "- Accuracy@10: {}", percent(m.accuracy_at_10, 2))?;
    writeln!(md, "- Mean Reciprocal Rank: {:.4}", m.mean_reciprocal_rank)?;
    writeln!(md, "- Average Rank: {:.2}", m.average_rank)?;
    writeln!(md, "- Total Queries: {}", m.total_queries)?;
    writeln!(md, "- Successful Queries: {}", m.successful_queries)?;
    if m.total_queries > 0 {
        writeln!(md, "- Success Rate: {}\n", percent(m.success_rate(), 2))?;
    } else {
        writeln!(md, "- Success Rate: N/A\n")?;
    }

    writeln!(md, "**Cost Analysis:**")?;
    writeln!(md, "- Search Tokens: {}", thousands(s.cost.search_tokens))?;
    writeln!(md, "- Tester Tokens: {}", thousands(s.cost.tester_tokens))?;
    writeln!(md, "- Total Tokens: {}", thousands(s.cost.total_tokens))?;
    writeln!(md, "- Total Cost: ${:.4}", s.cost.total_cost_usd)?;
    if m.total_queries > 0 {
        writeln!(md, "- Cost per Query: ${:.6}\n", s.cost.cost_per_query)?;
    } else {
        writeln!(md, "- Cost per Query: N/A\n")?;
    }

    if !results.is_empty() {
        writeln!(md, "**Sample Results (first {} queries):**\n", SAMPLE_RESULTS)?;
        writeln!(md, "| # | Query | Source | Rank | Top Result | Similarity |")?;
        writeln!(md, "|---|-------|--------|------|------------|------------|")?;
        for (j, result) in results.iter().take(SAMPLE_RESULTS).enumerate() {
            let (top, similarity) = match result.top_result() {
                Some(top) => (
                    truncate_chars(top.name.as_deref().unwrap_or("N/A"), 20),
                    top.similarity,
                ),
                None => ("N/A".to_string(), 0.0),
            };
            writeln!(
                md,
                "| {} | {}... | {} | {} | {} | {:.3} |",
                j + 1,
                truncate_chars(result.query(), 30),
                truncate_chars(result.source_name(), 20),
                display_rank(result),
                top,
                similarity,
            )?;
        }
        writeln!(md)?;
    }

    let failed = failed_queries(results);
    if !failed.is_empty() {
        writeln!(md, "**Failed Queries ({}):**", failed.len())?;
        for (j, result) in failed.iter().take(LISTED_FAILURES).enumerate() {
            writeln!(
                md,
                "{}. \"{}\" (expected: {})",
                j + 1,
                truncate_chars(result.query(), 50),
                result.source_name()
            )?;
        }
        if failed.len() > LISTED_FAILURES {
            writeln!(md, "...and {} more", failed.len() - LISTED_FAILURES)?;
        }
        writeln!(md)?;
    }

    writeln!(md, "---\n")
}

fn write_run_configuration(md: &mut String, run: &TestRun) -> fmt::Result {
    writeln!(md, "**Configuration:**")?;
    writeln!(md, "- ID: `{}`", run.id)?;
    writeln!(md, "- Status: {}", run.status.as_deref().unwrap_or("unknown"))?;
    writeln!(md, "- Embedding: {}", readable_name(run.embedding_code(), ModelKind::Embedding))?;
    writeln!(md, "- Embedding Code: `{}`", run.embedding_code())?;
    writeln!(md, "- Enrichment: {}", readable_name(run.enrichment_code(), ModelKind::Enrichment))?;
    writeln!(md, "- Enrichment Code: `{}`", run.enrichment_code())?;
    writeln!(md, "- Tester: {}", readable_name(run.tester_code(), ModelKind::Tester))?;
    writeln!(md, "- Tester Code: `{}`", run.tester_code())?;
    writeln!(md, "- Target Queries: {}", run.target_query_count)?;
    writeln!(md, "- Completed Queries: {}", run.completed_query_count)?;
    writeln!(md, "- Difficulty: {}", run.difficulty_mode.as_deref().unwrap_or("unknown"))?;
    writeln!(md, "- Dynamic Weights: {}", run.use_dynamic_weights)?;
    writeln!(md, "- Created: {}\n", run.created.as_deref().unwrap_or("unknown"))
}

fn write_appendix(md: &mut String) -> fmt::Result {
    writeln!(md, "## 📖 Appendix: Naming Convention Guide\n")?;
    writeln!(md, "### Test Name Format\n")?;
    writeln!(md, "```\n{{enrichment}}_{{embedding}}_{{tester}}_{{mode}}_#{{number}}\n```\n")?;
    writeln!(md, "**Example:** `g25f_oai3l_gpt4o_mwM_#2`")?;
    writeln!(md, "- Enrichment: `g25f` = Gemini 2.5 Flash")?;
    writeln!(md, "- Embedding: `oai3l` = OpenAI text-embedding-3-large")?;
    writeln!(md, "- Tester: `gpt4o` = GPT-4o")?;
    writeln!(md, "- Mode: `mwM` = Manual Weights, Medium difficulty")?;
    writeln!(md, "- Number: `#2` = Second run\n")?;

    writeln!(md, "### Enrichment Model Codes\n")?;
    writeln!(md, "| Code | Model Name |\n|------|------------|")?;
    for (code, name) in ModelKind::Enrichment.documented_codes() {
        writeln!(md, "| `{}` | {} |", code, name)?;
    }

    writeln!(md, "\n### Embedding Model Codes\n")?;
    writeln!(md, "| Code | Model Name | Provider |\n|------|------------|----------|")?;
    for (code, name, provider) in EMBEDDING_PROVIDERS {
        writeln!(md, "| `{}` | {} | {} |", code, name, provider)?;
    }

    writeln!(md, "\n### Tester Model Codes\n")?;
    writeln!(md, "| Code | Model Name |\n|------|------------|")?;
    for (code, name) in ModelKind::Tester.documented_codes() {
        writeln!(md, "| `{}` | {} |", code, name)?;
    }

    writeln!(md, "\n### Mode Codes\n")?;
    writeln!(md, "| Code | Meaning |\n|------|----------|")?;
    writeln!(md, "| `mwM` | **Manual Weights, Medium** - Fixed weights, medium difficulty |")?;
    writeln!(md, "| `dwM` | **Dynamic Weights, Medium** - AI-adjusted weights per query |")?;
    writeln!(md, "| `mwE` | **Manual Weights, Easy** - Fixed weights, easy difficulty |")?;
    writeln!(md, "| `mwH` | **Manual Weights, Hard** - Fixed weights, hard difficulty |\n")?;

    writeln!(md, "### Weight Types\n")?;
    writeln!(md, "**Manual Weights (mw):**")?;
    writeln!(md, "- Identity, Physical, Context weights are fixed")?;
    writeln!(md, "- Same weights used for all queries\n")?;
    writeln!(md, "**Dynamic Weights (dw):**")?;
    writeln!(md, "- Weights adjusted per query based on classified intent\n")?;

    writeln!(md, "### Difficulty Modes\n")?;
    writeln!(md, "- **Easy (E):** Simple, direct queries")?;
    writeln!(md, "- **Medium (M):** Standard queries with some complexity")?;
    writeln!(md, "- **Hard (H):** Complex, ambiguous, or tricky queries")
}
