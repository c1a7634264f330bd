//! Error types for the executor crate.

use std::time::Duration;

use facade_core::ValidationError;

/// Failures reported by a [`QueryBackend`](crate::QueryBackend).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    /// Error raised by the sqlx driver or pool.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Error text from a backend that does not use sqlx.
    #[error("{0}")]
    Driver(String),

    /// The query did not complete within the configured execution timeout.
    #[error("query timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

/// Errors returned by [`QueryExecutor`](crate::QueryExecutor).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The query was refused before any database call. Passed through
    /// unchanged so callers see the validator's own message.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The database call failed.
    #[error("Error executing query: {0}")]
    Execution(#[source] BackendError),
}
