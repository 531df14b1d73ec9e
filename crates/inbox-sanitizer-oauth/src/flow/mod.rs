//! `OAuth2` authorization flows.

mod code;
mod loopback;
mod pkce;

pub use code::AuthorizationCodeFlow;
pub use loopback::LoopbackReceiver;
pub use pkce::PkceChallenge;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::token::Token;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Generates an unguessable value for the `state` parameter.
#[must_use]
pub fn random_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Common `OAuth2` client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (installed apps still receive one from Google).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Refreshes an access token using its refresh token.
    ///
    /// The refresh token is carried over when the server does not issue a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the token has no refresh token or the server rejects it.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;
        debug!(provider = %self.provider.name, "refreshing access token");

        let mut new_token = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }
        Ok(new_token)
    }

    /// Exchanges an authorization code for tokens.
    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<Token> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ])
        .await
    }

    /// Posts a form to the token endpoint, adding the client credentials.
    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<Token> {
        let mut params: Vec<(&str, &str)> = grant.to_vec();
        params.push(("client_id", self.client_id.as_str()));
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        read_token_response(status, &body, Utc::now())
    }
}

/// Interpret a token endpoint reply received at `received_at`.
///
/// Error bodies that are not RFC 6749 JSON keep their status and text.
fn read_token_response(
    status: StatusCode,
    body: &str,
    received_at: DateTime<Utc>,
) -> Result<Token> {
    if !status.is_success() {
        return Err(match serde_json::from_str::<EndpointError>(body) {
            Ok(rejection) => Error::oauth_error(rejection.error, rejection.error_description),
            Err(_) => Error::Endpoint {
                status: status.as_u16(),
                body: body.trim().to_string(),
            },
        });
    }

    let grant: GrantResponse = serde_json::from_str(body)?;
    Ok(grant.into_token(received_at))
}

/// Successful token endpoint body.
#[derive(Debug, Deserialize)]
struct GrantResponse {
    access_token: String,
    token_type: String,
    #[serde(default)]
    expires_in: Option<u32>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl GrantResponse {
    /// `expires_in` is relative, so it is anchored to the time of receipt.
    fn into_token(self, received_at: DateTime<Utc>) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_at: self
                .expires_in
                .map(|secs| received_at + Duration::seconds(i64::from(secs))),
            refresh_token: self.refresh_token,
            scope: self.scope,
        }
    }
}

/// Error body defined by RFC 6749 section 5.2.
#[derive(Debug, Deserialize)]
struct EndpointError {
    error: String,
    #[serde(default)]
    error_description: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_client_with_secret() {
        let client = OAuthClient::new("1234.apps.googleusercontent.com", Provider::google().unwrap())
            .with_client_secret("GOCSPX-secret")
            .with_redirect_uri("http://127.0.0.1:8085");

        assert_eq!(client.client_secret.as_deref(), Some("GOCSPX-secret"));
        assert_eq!(client.redirect_uri.as_deref(), Some("http://127.0.0.1:8085"));
    }

    #[test]
    fn test_random_state_is_unique() {
        let a = random_state();
        let b = random_state();
        assert_eq!(a.len(), 22);
        assert_ne!(a, b);
    }

    #[test]
    fn test_google_grant_becomes_token() {
        let body = r#"{
            "access_token": "ya29.a0AfB",
            "expires_in": 3599,
            "refresh_token": "1//0gLx",
            "scope": "https://www.googleapis.com/auth/gmail.modify",
            "token_type": "Bearer"
        }"#;
        let grant: GrantResponse = serde_json::from_str(body).unwrap();
        let now = Utc::now();
        let token = grant.into_token(now);

        assert_eq!(token.access_token, "ya29.a0AfB");
        assert_eq!(token.refresh_token.as_deref(), Some("1//0gLx"));
        assert_eq!(token.expires_at, Some(now + Duration::seconds(3599)));
        assert!(!token.is_expired_at(now));
    }

    #[test]
    fn test_endpoint_error_without_description() {
        let rejection: EndpointError = serde_json::from_str(r#"{"error": "invalid_grant"}"#).unwrap();
        let err = Error::oauth_error(rejection.error, rejection.error_description);
        assert!(err.is_invalid_grant());
    }

    #[test]
    fn test_rejection_maps_to_oauth_error() {
        let err = read_token_response(
            StatusCode::BAD_REQUEST,
            r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#,
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.is_invalid_grant());
    }

    #[test]
    fn test_non_json_rejection_keeps_status() {
        let err = read_token_response(
            StatusCode::BAD_GATEWAY,
            "<html>Bad Gateway</html>\n",
            Utc::now(),
        )
        .unwrap_err();
        assert!(
            matches!(err, Error::Endpoint { status: 502, ref body } if body == "<html>Bad Gateway</html>")
        );
    }

    #[test]
    fn test_malformed_grant_is_json_error() {
        let err = read_token_response(StatusCode::OK, r#"{"token_type": "Bearer"}"#, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_successful_reply_becomes_token() {
        let now = Utc::now();
        let token = read_token_response(
            StatusCode::OK,
            r#"{"access_token": "ya29.b", "token_type": "Bearer", "expires_in": 3600}"#,
            now,
        )
        .unwrap();
        assert_eq!(token.access_token, "ya29.b");
        assert_eq!(token.expires_at, Some(now + Duration::seconds(3600)));
        assert!(token.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let client = OAuthClient::new("id", Provider::google().unwrap());
        let result = client.refresh_token(&Token::new("expired", "Bearer")).await;
        assert!(matches!(result, Err(Error::NoRefreshToken)));
    }
}
