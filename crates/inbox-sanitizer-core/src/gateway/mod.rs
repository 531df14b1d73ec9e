//! Mailbox gateway: the provider operations triage needs.
//!
//! [`MailboxGateway`] is the seam between the batch runner and a concrete
//! mail provider. [`GmailGateway`] talks to the Gmail REST API; tests use
//! in-memory implementations.

mod gmail;

use async_trait::async_trait;

use crate::rules::Action;
use crate::triage::{MessageId, MessageSummary};

pub use gmail::{DEFAULT_BASE_URL, GmailGateway, Profile};

/// Errors returned by mailbox providers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The credential was rejected or could not be produced.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The message does not exist.
    #[error("Message not found: {0}")]
    NotFound(MessageId),

    /// The provider answered with a non-success status.
    #[error("Provider error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error text from the provider.
        message: String,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider response could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Operations on a remote mailbox.
///
/// Implementations must be idempotent with respect to
/// [`apply_disposition`](Self::apply_disposition).
#[async_trait]
pub trait MailboxGateway: Send + Sync {
    /// List up to `limit` message ids matching the provider search `scope`.
    async fn list_candidates(&self, scope: &str, limit: u32)
    -> Result<Vec<MessageId>, GatewayError>;

    /// Fetch the triage fields of one message. `Ok(None)` if it vanished.
    async fn fetch_summary(&self, id: &MessageId) -> Result<Option<MessageSummary>, GatewayError>;

    /// Archive or delete one message.
    async fn apply_disposition(&self, id: &MessageId, action: Action) -> Result<(), GatewayError>;
}

/// Supplies bearer tokens for provider requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Current access token, refreshed if it is about to expire.
    async fn access_token(&self) -> Result<String, GatewayError>;
}

/// A fixed access token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, GatewayError> {
        Ok(self.0.clone())
    }
}
