//! Core types for the SQL query facade.
//!
//! Defines the request/response contract of the query endpoint and the
//! textual validator that gates which statements may reach the database.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod model;
pub mod validator;

pub use error::{RequestError, ValidationError};
pub use model::{ErrorBody, HealthStatus, QueryRequest, QueryResponse, Row};
pub use validator::{normalize, validate_query, FORBIDDEN_KEYWORDS};
