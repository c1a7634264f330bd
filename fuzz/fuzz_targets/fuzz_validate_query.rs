//! Fuzz target: the query validator.
//!
//! Arbitrary UTF-8 must never panic the validator, and every accepted query
//! must start with `select` and contain no denylisted keyword.

#![no_main]

use facade_core::{normalize, validate_query, FORBIDDEN_KEYWORDS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(query) = std::str::from_utf8(data) else {
        return;
    };

    let first = validate_query(query);
    assert_eq!(first, validate_query(query), "validation must be deterministic");

    if first.is_ok() {
        let normalized = normalize(query);
        assert!(normalized.starts_with("select"));
        assert!(FORBIDDEN_KEYWORDS.iter().all(|kw| !normalized.contains(kw)));
    }
});
