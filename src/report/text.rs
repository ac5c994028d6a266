//! Plain-text renderers for terminal output and the query analysis file.

use crate::eval::analysis::{display_rank, QueryOverlap, RankStatus};
use crate::eval::coverage::{EmbeddingCoverage, LOW_COVERAGE_THRESHOLD};
use crate::eval::summary::RunSummary;
use crate::report::percent;
use crate::store::{TestResult, TestRun};
use std::fmt::{self, Write};

const RULE_WIDTH: usize = 80;
const FILE_SAMPLE: usize = 50;

/// Section heading framed by `=` rules.
pub fn banner(title: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("{}\n{}\n{}", rule, title, rule)
}

/// Accuracy and query counts for one run.
pub fn run_stats(summary: &RunSummary) -> String {
    let m = &summary.metrics;
    format!(
        "📊 Stats:\n- Accuracy@1: {}\n- Total queries: {}\n- Successful: {}",
        percent(m.accuracy_at_1, 1),
        m.total_queries,
        m.successful_queries
    )
}

/// Short accuracy line per compared run.
pub fn comparison_lines(summaries: &[RunSummary]) -> String {
    let mut out = String::new();
    for s in summaries {
        let _ = write!(
            out,
            "\n{}:\n- Accuracy@1: {}\n- Queries: {}\n",
            s.run.name,
            percent(s.metrics.accuracy_at_1, 1),
            s.metrics.total_queries
        );
    }
    out
}

/// Numbered listing of the first `limit` queries with hit/near/miss markers.
pub fn sample_queries(results: &[TestResult], limit: usize) -> String {
    let mut out = String::new();
    let _ = write_sample_queries(&mut out, results, limit);
    out
}

fn write_sample_queries(out: &mut String, results: &[TestResult], limit: usize) -> fmt::Result {
    for (i, result) in results.iter().take(limit).enumerate() {
        let n = i + 1;
        writeln!(
            out,
            "{}. {} (rank {}) \"{}\"",
            n,
            RankStatus::of(result.correct_rank).marker(),
            display_rank(result),
            result.query()
        )?;
        writeln!(out, "   Expected: {}", result.source_name())?;
        if n % 5 == 0 {
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Unique-query counts and overlap against the reference run.
pub fn overlap_lines(reference_name: &str, overlaps: &[(String, QueryOverlap)]) -> String {
    let mut out = String::new();
    if let Some((_, first)) = overlaps.first() {
        let _ = writeln!(out, "{}: {} unique queries", reference_name, first.reference_unique);
    }
    for (name, overlap) in overlaps {
        let _ = writeln!(
            out,
            "{}: {} unique queries\n  Overlap: {} queries ({:.1}%)",
            name, overlap.other_unique, overlap.shared, overlap.percent
        );
    }
    out
}

/// Configuration fields that explain diverging results.
pub fn configuration_block(run: &TestRun) -> String {
    let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
    format!(
        "{}:\n\
         - Embedding Model: {}\n\
         - Embedding Key: {}\n\
         - Enrichment Model: {}\n\
         - Tester Model: {}\n\
         - Difficulty: {}\n\
         - Dynamic Weights: {}\n\
         - Weights: Identity={}, Physical={}, Context={}",
        run.name,
        or_na(&run.embedding_model),
        or_na(&run.embedding_key),
        or_na(&run.enrichment_model),
        or_na(&run.tester_model),
        or_na(&run.difficulty_mode),
        run.use_dynamic_weights,
        run.mvs_weight_identity,
        run.mvs_weight_physical,
        run.mvs_weight_context,
    )
}

/// Checklist printed after the configuration block.
pub fn potential_issues(target_key: &str) -> String {
    format!(
        "⚠️  POTENTIAL ISSUES TO CHECK:\n\
         1. Are queries actually the same difficulty?\n\
         2. Is embedding_key correct? Should be '{}' or similar\n\
         3. Were groups re-embedded with this model?\n\
         4. Is this test somehow using cached/different data?",
        target_key
    )
}

/// Body of `query_analysis.txt`: the reference run and its first queries.
pub fn analysis_file(summary: &RunSummary, results: &[TestResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "QUERY COMPARISON REPORT");
    let _ = writeln!(out, "{}\n", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "Reference Test: {}", summary.run.name);
    let _ = writeln!(out, "Accuracy@1: {}\n", percent(summary.metrics.accuracy_at_1, 1));
    let _ = writeln!(out, "First {} Queries:\n", FILE_SAMPLE);
    for (i, result) in results.iter().take(FILE_SAMPLE).enumerate() {
        let _ = writeln!(
            out,
            "{}. Rank {}: \"{}\" -> {}",
            i + 1,
            display_rank(result),
            result.query(),
            result.source_name()
        );
    }
    out
}

/// Coverage table plus a verdict for `target_key`.
pub fn coverage_table(coverage: &EmbeddingCoverage, target_key: &str) -> String {
    let mut out = String::new();
    let _ = write_coverage(&mut out, coverage, target_key);
    out
}

fn write_coverage(out: &mut String, coverage: &EmbeddingCoverage, target_key: &str) -> fmt::Result {
    writeln!(out, "✅ Total groups with embeddings: {}\n", coverage.total_groups)?;
    writeln!(out, "📊 Embedding Coverage by Key:\n")?;
    writeln!(out, "{:<20} {:<10} {:<10}", "Key", "Groups", "%")?;
    writeln!(out, "{}", "-".repeat(40))?;
    for key in &coverage.keys {
        writeln!(out, "{:<20} {:<10} {:.1}%", key.key, key.groups, key.percent)?;
    }
    writeln!(out)?;

    match coverage.groups_for(target_key) {
        Some(count) => {
            writeln!(out, "⚠️  Key '{}': {} groups", target_key, count)?;
            writeln!(
                out,
                "   This is {}",
                if count < LOW_COVERAGE_THRESHOLD { "VERY LOW" } else { "OK" }
            )?;
        }
        None => {
            writeln!(out, "❌ Key '{}' NOT FOUND in any groups!", target_key)?;
            writeln!(out, "   Need to regenerate embeddings for this key")?;
        }
    }

    writeln!(out, "\n💡 Recommendation:")?;
    if coverage.is_low(target_key) {
        writeln!(out, "   1. Go to UI → Embedding Tests → Regeneration")?;
        // Keys are `<enrichment>_<embedding>`
        match target_key.split_once('_') {
            Some((enrichment, embedding)) => writeln!(
                out,
                "   2. Create job for: enrichment={}, embedding={}",
                enrichment, embedding
            )?,
            None => writeln!(out, "   2. Create job for key: {}", target_key)?,
        }
        writeln!(out, "   3. Wait for completion (~5-10 min)")?;
        writeln!(out, "   4. Re-run test")?;
    } else {
        writeln!(out, "   Key has enough groups, test should work correctly")?;
    }
    Ok(())
}
