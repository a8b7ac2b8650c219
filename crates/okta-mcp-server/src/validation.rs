//! Guards for identifiers that get interpolated into API paths.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::OktaError;

/// Path separators, URL-reserved characters and traversal sequences,
/// matched case-insensitively.
const FORBIDDEN_PATTERNS: [&str; 8] = ["/", "\\", "..", "?", "#", "%2f", "%5c", "%2e%2e"];

const VALID_ID_PATTERN: &str = r"^[a-zA-Z0-9_\-@.+]+$";

static VALID_ID: OnceLock<Option<Regex>> = OnceLock::new();

/// Reject IDs that could redirect a request to a different API path.
///
/// Okta IDs are alphanumeric with `-` and `_`; logins add `@`, `.` and `+`.
pub fn validate_okta_id<'a>(value: &'a str, id_type: &str) -> Result<&'a str, OktaError> {
    if value.is_empty() {
        return Err(OktaError::InvalidId(format!("{id_type} cannot be empty")));
    }

    let lower = value.to_lowercase();
    if let Some(pattern) = FORBIDDEN_PATTERNS.iter().find(|p| lower.contains(*p)) {
        warn!("Rejected {id_type} containing forbidden pattern '{pattern}': {value}");
        return Err(OktaError::InvalidId(format!(
            "Invalid {id_type}: contains forbidden character or pattern '{pattern}'. \
             IDs must not contain path traversal sequences or URL-reserved characters."
        )));
    }

    let allowed = VALID_ID
        .get_or_init(|| Regex::new(VALID_ID_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value));
    if !allowed {
        warn!("Rejected {id_type} with invalid characters: {value}");
        return Err(OktaError::InvalidId(format!(
            "Invalid {id_type}: contains invalid characters. IDs must contain only \
             alphanumeric characters, hyphens, underscores, at signs, dots, and plus signs."
        )));
    }

    Ok(value)
}
