//! Error types for `OAuth2` operations.

use std::io;

/// Result type alias for `OAuth2` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `OAuth2` error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (loopback listener).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A successful token endpoint reply could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The token endpoint failed without an RFC 6749 error body.
    #[error("Token endpoint returned {status}: {body}")]
    Endpoint {
        /// HTTP status code.
        status: u16,
        /// Response text.
        body: String,
    },

    /// `OAuth2` error returned by the authorization or token endpoint.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// No refresh token available.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// User denied authorization in the browser.
    #[error("User denied authorization")]
    AccessDenied,

    /// The user did not finish authorizing in time.
    #[error("Authorization timed out after {0} seconds")]
    Timeout(u64),

    /// The redirect did not carry the expected `state` value.
    #[error("Authorization state mismatch")]
    StateMismatch,

    /// The redirect request could not be understood.
    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns true if the server rejected the refresh token itself, meaning
    /// the user must authorize again.
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::OAuth { error, .. } if error == "invalid_grant")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grant_detection() {
        assert!(Error::oauth_error("invalid_grant", "Token has been revoked").is_invalid_grant());
        assert!(!Error::oauth_error("invalid_client", "").is_invalid_grant());
        assert!(!Error::NoRefreshToken.is_invalid_grant());
    }

    #[test]
    fn test_oauth_error_display() {
        let err = Error::oauth_error("invalid_grant", "Bad Request");
        assert_eq!(err.to_string(), "OAuth2 error: invalid_grant - Bad Request");
    }
}
