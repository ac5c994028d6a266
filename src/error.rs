use thiserror::Error;

/// Main error type for embedeval
#[derive(Error, Debug)]
pub enum EvalError {
    /// Transport-level HTTP failures (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Results store returned a non-success response
    #[error("Store error: {0}")]
    Store(String),

    /// Authentication against the results store failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Experiment-tracking upload errors
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Insights (chat completion) errors
    #[error("Insights error: {0}")]
    Insights(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using EvalError
pub type Result<T> = std::result::Result<T, EvalError>;
