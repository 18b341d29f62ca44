use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Reasons a long-running analysis stopped before producing a result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("analysis cancelled by caller")]
    Cancelled,

    #[error("analysis deadline exceeded")]
    DeadlineExceeded,
}
