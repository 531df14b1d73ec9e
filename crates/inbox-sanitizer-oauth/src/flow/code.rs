//! Installed-application authorization code flow.

use super::{OAuthClient, PkceChallenge, random_state};
use crate::error::{Error, Result};
use crate::token::Token;
use url::Url;

/// One authorization attempt for an installed application.
///
/// Every attempt carries its own PKCE verifier and `state` value; build a new
/// flow for each browser round trip. The redirect URI must be set on the
/// client before the flow is created.
#[derive(Debug)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
    pkce: PkceChallenge,
    state: String,
    scopes: Vec<String>,
}

impl AuthorizationCodeFlow {
    /// Start an attempt requesting the provider's default scopes.
    #[must_use]
    pub fn new(client: OAuthClient) -> Self {
        let scopes = client.provider.default_scopes.clone();
        Self {
            client,
            pkce: PkceChallenge::generate(),
            state: random_state(),
            scopes,
        }
    }

    /// Request `scopes` instead of the provider defaults.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// The `state` value the redirect must echo back.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// The client used for the code exchange.
    #[must_use]
    pub const fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Consent page URL to open in the user's browser.
    ///
    /// Google additionally gets `access_type=offline` and `prompt=consent` so
    /// that a refresh token is issued on every grant.
    #[must_use]
    pub fn authorization_url(&self) -> Url {
        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", "code"),
            ("client_id", self.client.client_id.as_str()),
            ("state", self.state.as_str()),
            ("code_challenge", self.pkce.challenge()),
            ("code_challenge_method", self.pkce.method()),
        ];
        if let Some(redirect_uri) = &self.client.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }
        let scope = self.scopes.join(" ");
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }
        if self.client.provider.is_google() {
            params.push(("access_type", "offline"));
            params.push(("prompt", "consent"));
        }

        let mut url = self.client.provider.auth_url.clone();
        url.query_pairs_mut().extend_pairs(params);
        url
    }

    /// Trade the code from the redirect for a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the client has no redirect URI, or
    /// the token endpoint's error.
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        let redirect_uri = self
            .client
            .redirect_uri
            .as_deref()
            .ok_or_else(|| Error::InvalidConfig("redirect URI not set".into()))?;
        self.client
            .exchange_code(code, redirect_uri, self.pkce.verifier())
            .await
    }
}
