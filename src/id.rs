//! ID and clock utilities
//!
//! Request identifiers for tracing a call through the gateway, plus wall-clock helpers.

use uuid::Uuid;

/// Current Unix time in fractional seconds
pub fn now_secs_f64() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Generate a fresh request ID
///
/// Format: hyphenated UUID v4
/// Example: `2f1c7a9e-3b4d-4e8f-9a10-5c6d7e8f9a0b`
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Use the caller's request ID when present and non-blank, otherwise generate one
pub fn resolve_request_id(supplied: Option<String>) -> String {
    match supplied {
        Some(id) if !id.trim().is_empty() => id,
        _ => generate_request_id(),
    }
}
