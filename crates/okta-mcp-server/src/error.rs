//! Error types shared by the API client, the credential provider and the tools.

use thiserror::Error;

/// Failures while obtaining or refreshing an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("token endpoint returned HTTP {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("failed to build client assertion: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    #[error("access denied by user")]
    AccessDenied,

    #[error("device authorization expired before the user approved it")]
    DeviceCodeExpired,

    #[error("{0}")]
    Other(String),
}

/// Result of every call against the Okta management API.
///
/// `Api` carries an explicit error payload returned by Okta. Every other
/// variant is an unexpected failure on our side of the wire.
#[derive(Debug, Error)]
pub enum OktaError {
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    InvalidId(String),
}

impl OktaError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        OktaError::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether Okta itself answered with an error payload.
    pub fn is_api_error(&self) -> bool {
        matches!(self, OktaError::Api { .. })
    }

    /// The `{"error": ...}` text tools hand back for single-call operations.
    pub fn to_tool_message(&self) -> String {
        match self {
            OktaError::Api { .. } | OktaError::InvalidId(_) => format!("Error: {self}"),
            _ => format!("Exception: {self}"),
        }
    }
}

pub type OktaResult<T> = Result<T, OktaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_render_as_error() {
        let err = OktaError::api(404, "Not found: Resource not found: 00g1 (UserGroup)");
        assert!(err.is_api_error());
        assert_eq!(
            err.to_tool_message(),
            "Error: HTTP 404: Not found: Resource not found: 00g1 (UserGroup)"
        );
    }

    #[test]
    fn other_failures_render_as_exception() {
        let err = OktaError::Auth(AuthError::AccessDenied);
        assert!(!err.is_api_error());
        assert!(err.to_tool_message().starts_with("Exception: "));
    }
}
