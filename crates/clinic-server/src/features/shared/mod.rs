//! Shared utilities and types for feature modules
//!
//! - **validation**: Field rules shared by the CSV validator and the HTTP features
//! - **test_helpers**: In-memory state and response helpers (test-only)

pub mod validation;

#[cfg(test)]
pub mod test_helpers;

/// Parse an external id taken from a URL path segment.
///
/// Returns `None` for anything that is not an integer; non-positive values
/// parse and simply match nothing.
pub fn parse_path_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}
