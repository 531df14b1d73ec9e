//! Credential acquisition for the Gmail API.
//!
//! - [`ClientSecrets`]: the OAuth client downloaded from the Google Cloud console
//! - [`TokenStore`]: where the granted token lives between runs (system
//!   keyring by default, or a JSON file)
//! - [`Authorizer`]: loads, refreshes or interactively obtains a token and
//!   hands out access tokens to the gateway

mod authorizer;
mod secrets;
mod store;

use std::path::PathBuf;

pub use authorizer::{AuthMode, Authorizer};
pub use secrets::ClientSecrets;
pub use store::{TokenStore, default_token_path};

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The OAuth client file is missing.
    #[error(
        "Client secrets not found at {}. Create an OAuth client (Desktop app) in the Google \
         Cloud console, enable the Gmail API and save the downloaded JSON there.",
        .0.display()
    )]
    MissingClientSecrets(PathBuf),

    /// The OAuth client file has neither an `installed` nor a `web` section.
    #[error("Invalid client secrets: {0}")]
    InvalidClientSecrets(String),

    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Token file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored token or client file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authorization server interaction failed.
    #[error("OAuth error: {0}")]
    OAuth(#[from] inbox_sanitizer_oauth::Error),

    /// No usable token and interactive authorization is not allowed.
    #[error("Not authenticated. Run 'inbox-sanitizer auth' first.")]
    InteractiveRequired,

    /// No platform configuration directory.
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;
