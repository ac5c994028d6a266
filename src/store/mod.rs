//! Results-store access: PocketBase REST client and the embedding-test record types.

pub mod client;
pub mod types;

pub use client::PocketBaseClient;
pub use types::{Group, TestResult, TestRun, TopResult};
