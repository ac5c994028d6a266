//! Experiment-tracking export.

pub mod wandb;

pub use wandb::{UploadedRun, WandbExporter};
