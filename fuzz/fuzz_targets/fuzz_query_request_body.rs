//! Fuzz target: JSON deserialization of `QueryRequest`.
//!
//! Arbitrary bytes fed to the request decoder must never panic; decode
//! errors are expected.

#![no_main]

use facade_core::QueryRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = serde_json::from_slice::<QueryRequest>(data) {
        let _ = request.ensure_query_present();
    }
});
