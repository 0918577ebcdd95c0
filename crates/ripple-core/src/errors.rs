//! Error types for the ripple core library.

/// Top-level error enum for the ripple core library.
#[derive(Debug, thiserror::Error)]
pub enum RippleError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RippleResult<T> = Result<T, RippleError>;
