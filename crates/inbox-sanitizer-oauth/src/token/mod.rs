//! Granted credentials.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A token counts as expired this long before its real expiry, so a request
/// started just before the deadline does not race it.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Access token plus what is needed to renew it.
///
/// This is also the persisted form: stores serialize it as JSON, omitting
/// absent fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer credential sent with API requests.
    pub access_token: String,
    /// Normally `Bearer`.
    pub token_type: String,
    /// When `access_token` stops working; `None` means no known expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Long-lived credential for minting new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-separated scopes actually granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Token {
    /// A token with no expiry, refresh token or scope.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Attach a refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Attach an expiry.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True once `now` is within the expiry margin of `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - now <= Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }

    /// [`is_expired_at`](Self::is_expired_at) against the system clock.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Usable without a refresh.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }

    /// Renewable without user interaction.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// The refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRefreshToken`] if none was granted.
    pub fn refresh_token(&self) -> Result<&str> {
        self.refresh_token.as_deref().ok_or(Error::NoRefreshToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_no_expiry_never_expires() {
        let token = Token::new("ya29.a0", "Bearer");
        assert!(token.is_valid());
        assert!(!token.can_refresh());
    }

    #[test]
    fn test_expiry_margin() {
        let now = Utc::now();
        let soon = Token::new("a", "Bearer").with_expires_at(now + Duration::seconds(30));
        assert!(soon.is_expired_at(now));

        let later = Token::new("a", "Bearer").with_expires_at(now + Duration::seconds(3600));
        assert!(!later.is_expired_at(now));
        assert!(!later.is_expired_at(now + Duration::seconds(3539)));
        assert!(later.is_expired_at(now + Duration::seconds(3540)));
    }

    #[test]
    fn test_persisted_form_omits_absent_fields() {
        let token = Token::new("abc", "Bearer").with_refresh_token("def");
        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("expires_at"));
        assert!(!json.contains("scope"));

        let restored: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, token);
    }

    #[test]
    fn test_missing_refresh_token() {
        let token = Token::new("abc", "Bearer");
        assert!(matches!(token.refresh_token(), Err(Error::NoRefreshToken)));
        assert_eq!(
            token.with_refresh_token("1//0g").refresh_token().unwrap(),
            "1//0g"
        );
    }
}
