//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Rule file could not be parsed.
    #[error("Rule file error: {0}")]
    Rules(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mailbox provider call failed.
    #[error("Mailbox error: {0}")]
    Gateway(#[from] crate::gateway::GatewayError),
}

impl Error {
    /// Returns true if the error means the mailbox can no longer be reached
    /// with the current authorization.
    #[must_use]
    pub const fn is_credential(&self) -> bool {
        matches!(
            self,
            Self::Gateway(crate::gateway::GatewayError::Unauthorized(_))
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;

    #[test]
    fn test_only_rejected_credentials_are_credential_errors() {
        assert!(Error::from(GatewayError::Unauthorized("revoked".into())).is_credential());
        assert!(
            !Error::from(GatewayError::Api {
                status: 503,
                message: "unavailable".into(),
            })
            .is_credential()
        );
        assert!(!Error::from(std::io::Error::other("disk")).is_credential());
    }
}
