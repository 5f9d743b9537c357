//! Best-effort JSON recovery from free-form model output.
//!
//! Models are asked for bare JSON but regularly wrap it in prose or
//! markdown fences. Recovery tries, in order:
//!
//! 1. the whole text as JSON (any shape; nothing is schema-checked);
//! 2. the slice from the first `{` to the last `}` inclusive;
//! 3. an error record `{"error": "Unable to parse response", "raw_content": text}`.
//!
//! Step 2 is a heuristic, not a parser. A stray brace in the surrounding
//! prose widens the slice and makes it fail to parse, which then lands in
//! step 3.

use serde_json::{json, Value};
use tracing::warn;

/// `error` value of a record whose reply could not be parsed.
pub const UNPARSEABLE_ERROR: &str = "Unable to parse response";

/// Recover a JSON value from `raw`.
pub fn recover(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => return value,
        Err(e) => warn!("Reply is not bare JSON: {}", e),
    }

    match brace_slice(raw) {
        Some(candidate) => match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return value,
            Err(e) => warn!("Error parsing extracted JSON: {} in {:?}", e, candidate),
        },
        None => warn!("No JSON object found in the response"),
    }

    unparseable(raw)
}

/// The text between the first `{` and the last `}`, both inclusive.
pub fn brace_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end >= start).then(|| &raw[start..=end])
}

/// Build the degraded record for a reply that could not be parsed.
pub fn unparseable(raw: &str) -> Value {
    json!({
        "error": UNPARSEABLE_ERROR,
        "raw_content": raw,
    })
}
