//! Database backend abstraction trait.
//!
//! Lets the executor run against PostgreSQL in production and against
//! in-memory fakes in tests.

use async_trait::async_trait;
use facade_core::Row;

use crate::BackendError;

/// Something that can run SQL text and hand back rows.
///
/// Implementations must be `Send + Sync` so one instance can serve
/// concurrent requests.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run `sql` verbatim and return every row it produces.
    ///
    /// # Errors
    /// Returns a [`BackendError`] describing the driver failure
    /// (connectivity, syntax, permissions, and so on).
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, BackendError>;

    /// Check that the backend can currently serve queries.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if the database is unreachable.
    async fn health_check(&self) -> Result<(), BackendError>;
}
