//! Textual gate deciding whether a query may be sent to the database.
//!
//! The check is intentionally shallow: a prefix test followed by a substring
//! scan over the lowercased, trimmed text. It is not a SQL parser, so column
//! names such as `updated_at` trip the denylist, and comments or stacked
//! statements are only caught if they happen to contain a denylisted token.

use crate::error::ValidationError;

/// Keywords whose presence anywhere in the normalized query rejects it.
pub const FORBIDDEN_KEYWORDS: [&str; 7] =
    ["insert", "update", "delete", "drop", "create", "alter", "truncate"];

const SELECT_PREFIX: &str = "select";

/// Lowercase and trim a query for classification.
///
/// Trimming strips every char up to and including U+0020 (ASCII controls and
/// space) and nothing else, so non-breaking and ideographic spaces stay.
/// The result is only used to decide; callers execute the original text.
#[must_use]
pub fn normalize(query: &str) -> String {
    query.to_lowercase().trim_matches(|c: char| c <= ' ').to_owned()
}

/// Accept or reject a raw query string.
///
/// # Errors
/// Returns [`ValidationError::NotSelect`] if the normalized text does not
/// start with `select`, or [`ValidationError::ForbiddenKeyword`] if it
/// contains any entry of [`FORBIDDEN_KEYWORDS`].
pub fn validate_query(query: &str) -> Result<(), ValidationError> {
    let normalized = normalize(query);

    if !normalized.starts_with(SELECT_PREFIX) {
        return Err(ValidationError::NotSelect);
    }

    if let Some(keyword) = FORBIDDEN_KEYWORDS
        .iter()
        .copied()
        .find(|kw| normalized.contains(kw))
    {
        return Err(ValidationError::ForbiddenKeyword { keyword });
    }

    Ok(())
}
