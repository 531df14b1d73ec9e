//! Persistent storage for the granted token.
//!
//! The keyring variant uses the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use std::path::{Path, PathBuf};

use inbox_sanitizer_oauth::Token;
use keyring::Entry;
use tracing::{debug, warn};

use super::{CredentialError, CredentialResult};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "inbox-sanitizer";

/// Keyring user for the Gmail token.
const TOKEN_KEY: &str = "gmail_oauth_token";

/// Default token file: `<config_dir>/inbox-sanitizer/token.json`.
///
/// # Errors
///
/// Returns an error if the platform has no configuration directory.
pub fn default_token_path() -> CredentialResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(SERVICE_NAME).join("token.json"))
        .ok_or(CredentialError::NoConfigDir)
}

/// Where the token is kept between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStore {
    /// System keyring entry holding the JSON-serialized token.
    Keyring,
    /// JSON file.
    File(PathBuf),
}

impl TokenStore {
    /// Load the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or holds malformed data.
    pub fn load(&self) -> CredentialResult<Option<Token>> {
        match self {
            Self::Keyring => {
                let entry = Entry::new(SERVICE_NAME, TOKEN_KEY)?;
                match entry.get_password() {
                    Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
                    Err(keyring::Error::NoEntry) => {
                        debug!("No token in keyring");
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Self::File(path) => {
                if !path.exists() {
                    debug!("No token file at {}", path.display());
                    return Ok(None);
                }
                let json = std::fs::read_to_string(path)?;
                Ok(Some(serde_json::from_str(&json)?))
            }
        }
    }

    /// Persist `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn save(&self, token: &Token) -> CredentialResult<()> {
        let json = serde_json::to_string_pretty(token)?;
        match self {
            Self::Keyring => {
                Entry::new(SERVICE_NAME, TOKEN_KEY)?.set_password(&json)?;
                debug!("Stored token in keyring");
            }
            Self::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                write_private(path, &json)?;
                debug!("Stored token in {}", path.display());
            }
        }
        Ok(())
    }

    /// Remove the stored token. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be cleared.
    pub fn delete(&self) -> CredentialResult<bool> {
        match self {
            Self::Keyring => {
                let entry = Entry::new(SERVICE_NAME, TOKEN_KEY)?;
                match entry.delete_credential() {
                    Ok(()) => Ok(true),
                    Err(keyring::Error::NoEntry) => Ok(false),
                    Err(e) => {
                        warn!("Failed to delete token from keyring: {e}");
                        Err(e.into())
                    }
                }
            }
            Self::File(path) => match std::fs::remove_file(path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Human-readable location for messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Keyring => "system keyring".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
