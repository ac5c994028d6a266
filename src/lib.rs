pub mod config;
pub mod error;
pub mod eval;
pub mod insights;
pub mod report;
pub mod store;
pub mod tracking;

pub use config::Config;
pub use error::{EvalError, Result};
pub use eval::{compute_metrics, AggregateMetrics};
