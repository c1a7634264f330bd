//! Validated, timed query execution against a [`QueryBackend`].
//!
//! Every call walks `Validating -> {Rejected | Executing} -> {Succeeded | Failed}`
//! with no retries. Only the backend call is timed; validation is excluded.

use std::time::{Duration, Instant};

use facade_core::{validate_query, QueryRequest, QueryResponse};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{BackendError, ExecutorError, QueryBackend};

/// Runs read-only queries and shapes the outcome into a [`QueryResponse`].
///
/// Holds no per-request state, so one instance behind an `Arc` serves all
/// requests concurrently.
pub struct QueryExecutor<B: QueryBackend> {
    backend: B,
    timeout: Option<Duration>,
}

impl<B: QueryBackend> QueryExecutor<B> {
    /// Create an executor that waits on the backend for as long as it takes.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend, timeout: None }
    }

    /// Create an executor that abandons backend calls after `timeout`.
    #[must_use]
    pub fn with_timeout(backend: B, timeout: Duration) -> Self {
        Self { backend, timeout: Some(timeout) }
    }

    /// The configured execution timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Borrow the underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validate `query` and, if accepted, run it unmodified.
    ///
    /// Validation happens here even when the caller already checked, so the
    /// backend never sees a rejected statement.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Validation`] if the validator rejects the
    /// query, or [`ExecutorError::Execution`] if the backend fails or the
    /// timeout expires.
    pub async fn execute(&self, query: &str) -> Result<QueryResponse, ExecutorError> {
        let query_id = Uuid::new_v4();
        info!(%query_id, query, "validating query");

        if let Err(e) = validate_query(query) {
            warn!(%query_id, reason = ?e, "query rejected");
            return Err(e.into());
        }

        let start = Instant::now();
        let rows = match self.fetch(query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(%query_id, error = %e, "error executing query");
                return Err(ExecutorError::Execution(e));
            }
        };
        let elapsed = start.elapsed();

        info!(
            %query_id,
            row_count = rows.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "query succeeded"
        );
        Ok(QueryResponse::new(rows, elapsed))
    }

    /// Run the query carried by `request`. The documentation fields are ignored.
    ///
    /// # Errors
    /// Same as [`Self::execute`].
    pub async fn execute_request(
        &self,
        request: &QueryRequest,
    ) -> Result<QueryResponse, ExecutorError> {
        self.execute(&request.query).await
    }

    /// Probe the backend.
    ///
    /// # Errors
    /// Propagates the backend's [`BackendError`].
    pub async fn health_check(&self) -> Result<(), BackendError> {
        self.backend.health_check().await
    }

    async fn fetch(&self, query: &str) -> Result<Vec<facade_core::Row>, BackendError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.fetch_rows(query))
                .await
                .map_err(|_| BackendError::Timeout(limit))?,
            None => self.backend.fetch_rows(query).await,
        }
    }
}
