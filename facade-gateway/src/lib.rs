//! HTTP API gateway for the SQL query facade.
//!
//! Exposes a single query endpoint that validates a SELECT statement, runs it
//! through the executor, and returns the rows as JSON, plus a health probe.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod routes;
