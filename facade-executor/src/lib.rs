//! Query execution for the SQL query facade.
//!
//! Provides the [`QueryBackend`] seam, a PostgreSQL implementation on sqlx,
//! and the [`QueryExecutor`] that validates, times, and shapes each query.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod postgres;

pub use backend::QueryBackend;
pub use config::DatabaseConfig;
pub use error::{BackendError, ExecutorError};
pub use executor::QueryExecutor;
pub use postgres::PgBackend;
