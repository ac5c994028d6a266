//! Evaluation of recorded test runs: metrics (Accuracy@K, MRR), cost, comparisons.

pub mod analysis;
pub mod cost;
pub mod coverage;
pub mod metrics;
pub mod models;
pub mod summary;

pub use cost::RunCost;
pub use metrics::{compute_metrics, valid_rank, AggregateMetrics, RankedRecord};
pub use models::{readable_name, ModelKind};
pub use summary::{rank_by_accuracy, BestPerformers, RunFilter, RunSummary};
