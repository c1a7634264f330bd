//! Error types for the gateway crate.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use facade_core::{ErrorBody, RequestError, ValidationError};
use facade_executor::ExecutorError;

/// Errors that can occur during gateway request handling.
///
/// Display text is the `error` field of the response envelope, so variants
/// wrapping lower layers are transparent.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The body decoded but violates a binding constraint.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The validator refused the query.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An error propagated from the executor layer.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The body is not valid JSON for a query request.
    #[error("{0}")]
    InvalidBody(String),

    /// A handler panicked or failed in an unexpected way.
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status for this error.
    ///
    /// Every failure maps to `400`: bad input, refused queries and database
    /// errors are not distinguished on the wire.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
