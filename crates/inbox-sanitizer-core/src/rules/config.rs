//! Rule configuration model and loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;

/// Patterns that mark bulk mail when no rule file overrides them.
pub const DEFAULT_NEWSLETTER_PATTERNS: [&str; 6] = [
    "unsubscribe",
    "newsletter",
    "no-reply@",
    "noreply@",
    "weekly digest",
    "daily briefing",
];

/// Default age threshold in days.
pub const DEFAULT_MAX_AGE_DAYS: u32 = 30;

/// What happens to a message marked for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Remove from the inbox, keep in the mailbox.
    #[default]
    Archive,
    /// Permanent removal.
    Delete,
}

impl Action {
    /// Convert to the rule file representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Delete => "delete",
        }
    }

    /// Past-tense verb for log lines and summaries.
    #[must_use]
    pub const fn past_tense(&self) -> &'static str {
        match self {
            Self::Archive => "Archived",
            Self::Delete => "Deleted",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules deciding which messages leave the inbox.
///
/// Immutable for the duration of a run; load a fresh one to change rules.
/// Keys missing from the rule file take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Sender substrings that always keep a message.
    pub whitelist: Vec<String>,
    /// Sender substrings that always remove a message.
    pub blacklist: Vec<String>,
    /// Subject/snippet substrings marking bulk mail, checked in order.
    pub newsletter_patterns: Vec<String>,
    /// Messages older than this many whole days are removed.
    pub max_age_days: u32,
    /// Disposition for removed messages.
    pub action: Action,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            newsletter_patterns: DEFAULT_NEWSLETTER_PATTERNS
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            action: Action::Archive,
        }
    }
}

impl RuleConfig {
    /// Parse a YAML rule document. An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML, wrong value types or an unknown
    /// action.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        // A document holding only comments parses as null.
        let config: Option<Self> = serde_yaml::from_str(source)?;
        Ok(config.unwrap_or_default())
    }

    /// Load a rule file strictly.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Load a rule file, falling back to the defaults.
    ///
    /// A missing file is normal; an unreadable or malformed one is logged.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No rule file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load(path) {
            Ok(config) => {
                debug!(
                    whitelist = config.whitelist.len(),
                    blacklist = config.blacklist.len(),
                    patterns = config.newsletter_patterns.len(),
                    "Loaded rules from {}",
                    path.display()
                );
                config
            }
            Err(e) => {
                warn!("Error loading rule file {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }
}
