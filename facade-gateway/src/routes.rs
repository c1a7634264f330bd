//! Axum route handlers for the query facade API.

use std::{any::Any, sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use facade_core::{validate_query, HealthStatus, QueryRequest, QueryResponse};
use facade_executor::{QueryBackend, QueryExecutor};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::error::GatewayError;

// ── Shared state ─────────────────────────────────────────────────────────────

type Executor<B> = Arc<QueryExecutor<B>>;

const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router around the given executor.
pub fn create_router<B: QueryBackend + 'static>(executor: Executor<B>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::POST])
        .allow_headers(cors::Any)
        .max_age(CORS_MAX_AGE);

    Router::new()
        .route("/api/v1/query", post(execute_query::<B>))
        .route("/api/v1/health", get(health))
        .with_state(executor)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /api/v1/health` — liveness probe. Does not touch the database.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::healthy()))
}

/// `POST /api/v1/query` — validate and run a read-only query.
///
/// # Errors
/// Returns [`GatewayError::InvalidBody`] if the body is not a query request,
/// [`GatewayError::Request`] if `query` is empty, [`GatewayError::Validation`]
/// if the validator refuses it, or [`GatewayError::Executor`] if the
/// database call fails.
pub async fn execute_query<B: QueryBackend>(
    State(executor): State<Executor<B>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, GatewayError> {
    let Json(request) = payload?;
    request.ensure_query_present()?;

    if let Err(e) = validate_query(&request.query) {
        warn!(query = %request.query, reason = ?e, "query rejected");
        return Err(e.into());
    }
    let response = executor.execute_request(&request).await?;
    Ok(Json(response))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "unexpected error while handling request".to_owned()
    };
    error!(detail = %detail, "handler panicked");
    GatewayError::Internal(detail).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use facade_core::Row;
    use facade_executor::BackendError;
    use serde_json::json;
    use std::{
        io,
        sync::{Mutex, PoisonError},
    };
    use tower::ServiceExt;

    /// In-memory log sink for asserting on emitted events.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Serves one fixed row for every query.
    struct TestTableBackend;

    #[async_trait]
    impl QueryBackend for TestTableBackend {
        async fn fetch_rows(&self, _sql: &str) -> Result<Vec<Row>, BackendError> {
            let mut row = Row::new();
            row.insert("column1".to_owned(), json!("value1"));
            Ok(vec![row])
        }

        async fn health_check(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    struct UnreachableBackend;

    #[async_trait]
    impl QueryBackend for UnreachableBackend {
        async fn fetch_rows(&self, _sql: &str) -> Result<Vec<Row>, BackendError> {
            Err(BackendError::Driver("Connection refused".to_owned()))
        }

        async fn health_check(&self) -> Result<(), BackendError> {
            Err(BackendError::Driver("Connection refused".to_owned()))
        }
    }

    struct PanickingBackend;

    #[async_trait]
    impl QueryBackend for PanickingBackend {
        async fn fetch_rows(&self, _sql: &str) -> Result<Vec<Row>, BackendError> {
            panic!("driver exploded");
        }

        async fn health_check(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn app<B: QueryBackend + 'static>(backend: B) -> Router {
        create_router(Arc::new(QueryExecutor::new(backend)))
    }

    fn post_query(body: &str) -> Request<Body> {
        match Request::builder()
            .method(Method::POST)
            .uri("/api/v1/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
        {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        }
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = match app.oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        let status = resp.status();
        let bytes = match axum::body::to_bytes(resp.into_body(), 64 * 1024).await {
            Ok(b) => b,
            Err(e) => panic!("failed to read body: {e}"),
        };
        let body = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => panic!("invalid JSON: {e}"),
        };
        (status, body)
    }

    #[tokio::test]
    async fn query_select_returns_rows() {
        let (status, body) =
            send(app(TestTableBackend), post_query(r#"{"query":"SELECT * FROM TEST_TABLE"}"#))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([{"column1": "value1"}]));
        assert_eq!(body["rowCount"], 1);
        assert!(body["executionTime"].as_f64().is_some_and(|t| t >= 0.0));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn query_empty_string_returns_400() {
        let (status, body) = send(app(TestTableBackend), post_query(r#"{"query":""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query cannot be empty");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn query_drop_statement_returns_select_only_message() {
        let (status, body) =
            send(app(TestTableBackend), post_query(r#"{"query":"DROP TABLE TEST_TABLE"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only SELECT queries are allowed");
    }

    #[tokio::test]
    async fn query_updated_at_column_is_false_positive() {
        let (status, body) = send(
            app(TestTableBackend),
            post_query(r#"{"query":"SELECT updated_at FROM accounts"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query contains forbidden keywords");
    }

    #[tokio::test]
    async fn query_rejection_is_logged_at_warn_with_keyword() {
        let logs = CapturedLogs::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || sink.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (status, _) = send(
            app(TestTableBackend),
            post_query(r#"{"query":"SELECT updated_at FROM accounts"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let output = logs.contents();
        assert!(output.contains("WARN"), "rejection must log at warn, got {output:?}");
        assert!(output.contains("query rejected"), "missing rejection event: {output:?}");
        assert!(output.contains(r#"keyword: "update""#), "missing matched keyword: {output:?}");
    }

    #[tokio::test]
    async fn query_driver_failure_is_wrapped() {
        let (status, body) =
            send(app(UnreachableBackend), post_query(r#"{"query":"SELECT 1"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let msg = body["error"].as_str().unwrap_or_default();
        assert_eq!(msg, "Error executing query: Connection refused");
    }

    #[tokio::test]
    async fn query_missing_field_returns_400_envelope() {
        let (status, body) =
            send(app(TestTableBackend), post_query(r#"{"explanation":"no query"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|m| m.contains("query")));
    }

    #[tokio::test]
    async fn query_malformed_json_returns_400_envelope() {
        let (status, body) = send(app(TestTableBackend), post_query("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn query_handler_panic_returns_400_envelope() {
        let (status, body) =
            send(app(PanickingBackend), post_query(r#"{"query":"SELECT 1"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "driver exploded");
    }

    #[tokio::test]
    async fn health_response_format_returns_healthy_with_timestamp() {
        let req = match Request::builder().uri("/api/v1/health").body(Body::empty()) {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        let (status, body) = send(app(UnreachableBackend), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn cors_preflight_allows_post_from_any_origin() {
        let req = match Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/query")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
        {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        let resp = match app(TestTableBackend).oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        let headers = resp.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
            Some("*")
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_MAX_AGE).and_then(|v| v.to_str().ok()),
            Some("3600")
        );
    }
}
