//! Error types shared across the shiftminus crates.

/// Everything that can go wrong talking to the store, the messaging API,
/// or while validating caller input.
#[derive(Debug, thiserror::Error)]
pub enum ShiftError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ShiftError>;
