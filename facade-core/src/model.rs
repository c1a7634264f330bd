//! Wire types for the query endpoint and its envelopes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// One result row: column name to value, in result-set column order.
pub type Row = IndexMap<String, serde_json::Value>;

/// Body of `POST /api/v1/query`.
///
/// `explanation` and `tables` are carried for callers' documentation and
/// play no part in validation or execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// SQL text to run, sent to the database unmodified.
    pub query: String,
    /// Free-text description of what the query is meant to do.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Tables the caller believes the query touches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
}

impl QueryRequest {
    /// Build a request carrying only the query text.
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), explanation: None, tables: None }
    }

    /// Enforce the binding constraint on `query`.
    ///
    /// Only an empty string is refused here; whitespace-only text is left to
    /// the validator.
    ///
    /// # Errors
    /// Returns [`RequestError::EmptyQuery`] if `query` is empty.
    pub fn ensure_query_present(&self) -> Result<(), RequestError> {
        if self.query.is_empty() {
            return Err(RequestError::EmptyQuery);
        }
        Ok(())
    }
}

/// Successful result of a query.
///
/// Fields are private so `row_count` can only be derived from `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    data: Vec<Row>,
    row_count: usize,
    execution_time: f64,
    timestamp: DateTime<Utc>,
}

impl QueryResponse {
    /// Wrap fetched rows, stamping the response with the current time.
    #[must_use]
    pub fn new(data: Vec<Row>, elapsed: Duration) -> Self {
        Self {
            row_count: data.len(),
            data,
            execution_time: elapsed.as_secs_f64(),
            timestamp: Utc::now(),
        }
    }

    /// Result rows in the order the database returned them.
    #[must_use]
    pub fn data(&self) -> &[Row] {
        &self.data
    }

    /// Number of rows in [`Self::data`].
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Seconds spent in the database call.
    #[must_use]
    pub fn execution_time(&self) -> f64 {
        self.execution_time
    }

    /// When the response was built.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Envelope returned with every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), timestamp: Utc::now() }
    }
}

/// Body of `GET /api/v1/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    #[must_use]
    pub fn healthy() -> Self {
        Self { status: "healthy".to_owned(), timestamp: Utc::now() }
    }
}
