/// Errors produced while binding an inbound query request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RequestError {
    /// The `query` field was present but empty.
    #[error("Query cannot be empty")]
    EmptyQuery,
}

/// Reasons the validator refuses a query before it reaches the database.
///
/// The display text of each variant is the message returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The normalized query does not start with `select`.
    #[error("Only SELECT queries are allowed")]
    NotSelect,

    /// The normalized query contains a denylisted keyword as a substring.
    #[error("Query contains forbidden keywords")]
    ForbiddenKeyword {
        /// The first denylisted keyword found, for logging only.
        keyword: &'static str,
    },
}
