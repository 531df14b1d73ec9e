//! OAuth client secrets file.

use std::path::Path;

use inbox_sanitizer_oauth::{OAuthClient, Provider};
use serde::Deserialize;

use super::{CredentialError, CredentialResult};

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Client registration as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client id.
    pub client_id: String,
    /// Client secret; Google issues one even for installed apps.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Authorization endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Read a `credentials.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MissingClientSecrets`] if the file does not
    /// exist, or a parse error if it is not a client secrets document.
    pub fn load(path: impl AsRef<Path>) -> CredentialResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CredentialError::MissingClientSecrets(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Parse a client secrets document. The `installed` section wins over `web`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has no client section.
    pub fn from_json_str(contents: &str) -> CredentialResult<Self> {
        let file: SecretsFile = serde_json::from_str(contents)?;
        file.installed.or(file.web).ok_or_else(|| {
            CredentialError::InvalidClientSecrets(
                "expected an \"installed\" or \"web\" section".to_string(),
            )
        })
    }

    /// Google provider using this client's endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not a valid HTTPS URL.
    pub fn provider(&self) -> CredentialResult<Provider> {
        let provider = Provider::google_with_endpoints(&self.auth_uri, &self.token_uri)?;
        provider.validate()?;
        Ok(provider)
    }

    /// OAuth client for this registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints are invalid.
    pub fn client(&self) -> CredentialResult<OAuthClient> {
        let mut client = OAuthClient::new(&self.client_id, self.provider()?);
        if let Some(secret) = &self.client_secret {
            client = client.with_client_secret(secret);
        }
        Ok(client)
    }
}
