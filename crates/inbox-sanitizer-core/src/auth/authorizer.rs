//! Token acquisition and refresh.

use async_trait::async_trait;
use inbox_sanitizer_oauth::{AuthorizationCodeFlow, LoopbackReceiver, OAuthClient, Token};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{ClientSecrets, CredentialError, CredentialResult, TokenStore};
use crate::gateway::{AccessTokenSource, GatewayError};

/// Whether a browser round trip may be started when no usable token exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Open the consent page and wait for the redirect.
    Interactive,
    /// Fail with [`CredentialError::InteractiveRequired`] instead.
    NonInteractive,
}

/// Holds the current token and refreshes it on demand.
#[derive(Debug)]
pub struct Authorizer {
    client: OAuthClient,
    store: TokenStore,
    token: Mutex<Token>,
}

impl Authorizer {
    /// Build an authorizer around an already obtained token.
    #[must_use]
    pub fn new(client: OAuthClient, store: TokenStore, token: Token) -> Self {
        Self {
            client,
            store,
            token: Mutex::new(token),
        }
    }

    /// Produce a usable token.
    ///
    /// Tries, in order: the stored token if still valid, a refresh of the
    /// stored token, and (if `mode` allows) the interactive loopback flow.
    /// A refreshed or newly granted token is saved to `store`; a failed save
    /// is only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if no token could be obtained.
    pub async fn obtain(
        secrets: &ClientSecrets,
        store: TokenStore,
        mode: AuthMode,
    ) -> CredentialResult<Self> {
        let client = secrets.client()?;

        let stored = match store.load() {
            Ok(token) => token,
            Err(e) => {
                error!("Failed to load stored token: {e}");
                None
            }
        };

        let token = match stored {
            Some(token) if token.is_valid() => {
                info!("Loaded existing credentials from {}", store.describe());
                Some(token)
            }
            Some(token) if token.can_refresh() => {
                info!("Refreshing expired access token...");
                match client.refresh_token(&token).await {
                    Ok(refreshed) => {
                        info!("Token refreshed successfully");
                        persist(&store, &refreshed).await;
                        Some(refreshed)
                    }
                    Err(e) => {
                        warn!("Token refresh failed: {e}");
                        None
                    }
                }
            }
            _ => None,
        };

        let token = match (token, mode) {
            (Some(token), _) => token,
            (None, AuthMode::NonInteractive) => return Err(CredentialError::InteractiveRequired),
            (None, AuthMode::Interactive) => {
                let token = authorize_interactively(client.clone()).await?;
                persist(&store, &token).await;
                token
            }
        };

        Ok(Self::new(client, store, token))
    }

    /// Snapshot of the current token.
    pub async fn token(&self) -> Token {
        self.token.lock().await.clone()
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }
}

#[async_trait]
impl AccessTokenSource for Authorizer {
    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            if !token.can_refresh() {
                return Err(GatewayError::Unauthorized(
                    "access token expired and no refresh token is stored".to_string(),
                ));
            }
            let refreshed = self
                .client
                .refresh_token(&token)
                .await
                .map_err(|e| GatewayError::Unauthorized(e.to_string()))?;
            persist(&self.store, &refreshed).await;
            *token = refreshed;
        }
        Ok(token.access_token.clone())
    }
}

/// Save a token on the blocking pool, logging instead of failing.
async fn persist(store: &TokenStore, token: &Token) {
    let (writer, token) = (store.clone(), token.clone());
    match tokio::task::spawn_blocking(move || writer.save(&token)).await {
        Ok(Ok(())) => info!("Credentials saved to {}", store.describe()),
        Ok(Err(e)) => warn!("Could not save credentials: {e}"),
        Err(e) => warn!("Credential save task failed: {e}"),
    }
}

/// Run the installed-app flow through a loopback redirect.
async fn authorize_interactively(client: OAuthClient) -> CredentialResult<Token> {
    let receiver = LoopbackReceiver::bind(0).await?;
    let redirect_uri = receiver.redirect_uri();
    let flow = AuthorizationCodeFlow::new(client.with_redirect_uri(redirect_uri));
    let url = flow.authorization_url();

    info!("Starting OAuth2 authentication flow...");
    info!("If the browser does not open, visit: {url}");
    if let Err(e) = opener::open(url.as_str()) {
        warn!("Could not open browser: {e}");
    }

    let code = receiver.receive_code(flow.state()).await?;
    let token = flow.exchange_code(&code).await?;
    info!("Authentication successful");
    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn secrets() -> ClientSecrets {
        ClientSecrets::from_json_str(r#"{"installed": {"client_id": "abc", "client_secret": "s"}}"#)
            .unwrap()
    }

    fn file_store(dir: &tempfile::TempDir) -> TokenStore {
        TokenStore::File(dir.path().join("token.json"))
    }

    #[tokio::test]
    async fn test_non_interactive_without_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Authorizer::obtain(&secrets(), file_store(&dir), AuthMode::NonInteractive).await;
        assert!(matches!(result, Err(CredentialError::InteractiveRequired)));
    }

    #[tokio::test]
    async fn test_valid_stored_token_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir);
        let token = Token::new("stored-access", "Bearer")
            .with_expires_at(Utc::now() + Duration::hours(1));
        store.save(&token).unwrap();

        let authorizer = Authorizer::obtain(&secrets(), store, AuthMode::NonInteractive)
            .await
            .unwrap();

        assert_eq!(authorizer.access_token().await.unwrap(), "stored-access");
        assert_eq!(authorizer.token().await, token);
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let token =
            Token::new("old", "Bearer").with_expires_at(Utc::now() - Duration::minutes(5));
        let authorizer = Authorizer::new(secrets().client().unwrap(), file_store(&dir), token);

        let err = authorizer.access_token().await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_persist_writes_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir);
        let token = Token::new("fresh", "Bearer").with_refresh_token("1//0g");

        persist(&store, &token).await;

        assert_eq!(store.load().unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_persist_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let store = TokenStore::File(blocker.join("token.json"));

        persist(&store, &Token::new("fresh", "Bearer")).await;

        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_stored_token_without_refresh_needs_interaction() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir);
        store
            .save(&Token::new("old", "Bearer").with_expires_at(Utc::now() - Duration::minutes(5)))
            .unwrap();

        let result = Authorizer::obtain(&secrets(), store, AuthMode::NonInteractive).await;
        assert!(matches!(result, Err(CredentialError::InteractiveRequired)));
    }
}
