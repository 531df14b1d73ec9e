//! Triage data models.

use chrono::{DateTime, FixedOffset};

/// Opaque provider-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create a new message ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fields of a message that triage looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    /// Provider identifier.
    pub id: MessageId,
    /// `From` header, possibly empty.
    pub sender: String,
    /// `Subject` header, possibly empty.
    pub subject: String,
    /// Body preview, possibly empty.
    pub snippet: String,
    /// Parsed `Date` header; `None` when missing or unparsable.
    pub received_at: Option<DateTime<FixedOffset>>,
}

impl MessageSummary {
    /// Create a summary with empty text fields and no date.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(id),
            sender: String::new(),
            subject: String::new(),
            snippet: String::new(),
            received_at: None,
        }
    }

    /// Sets the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the snippet.
    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Sets the received date from a raw `Date` header value.
    #[must_use]
    pub fn with_date_header(mut self, header: &str) -> Self {
        self.received_at = Self::parse_date(header);
        self
    }

    /// Sets the received date.
    #[must_use]
    pub const fn with_received_at(mut self, received_at: DateTime<FixedOffset>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    /// Parse an RFC 2822 `Date` header.
    ///
    /// Accepts an omitted weekday and a trailing zone comment such as
    /// `(UTC)`. Anything else unparsable yields `None`.
    #[must_use]
    pub fn parse_date(header: &str) -> Option<DateTime<FixedOffset>> {
        let trimmed = header.trim();
        if trimmed.is_empty() {
            return None;
        }
        let without_comment = match trimmed.rfind('(') {
            Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim_end(),
            _ => trimmed,
        };
        DateTime::parse_from_rfc2822(without_comment).ok()
    }

    /// Subject shortened for log lines.
    #[must_use]
    pub fn subject_preview(&self, max_chars: usize) -> String {
        if self.subject.is_empty() {
            return "No subject".to_string();
        }
        self.subject.chars().take(max_chars).collect()
    }
}

/// Which rule decided a message, with the entry that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// Sender matched a whitelist entry.
    Whitelisted(String),
    /// Sender matched a blacklist entry.
    Blacklisted(String),
    /// Subject or snippet matched a newsletter pattern.
    Newsletter(String),
    /// Message is older than the configured threshold.
    TooOld {
        /// Configured threshold in days.
        max_age_days: u32,
    },
    /// Nothing matched; kept by default.
    NoRulesMatched,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whitelisted(entry) => write!(f, "whitelisted domain: {entry}"),
            Self::Blacklisted(entry) => write!(f, "blacklisted domain: {entry}"),
            Self::Newsletter(pattern) => write!(f, "newsletter pattern: {pattern}"),
            Self::TooOld { max_age_days } => write!(f, "older than {max_age_days} days"),
            Self::NoRulesMatched => f.write_str("no rules matched"),
        }
    }
}

/// Outcome of triaging one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Leave the message where it is.
    Keep(Reason),
    /// Apply the configured disposition.
    Remove(Reason),
}

impl Decision {
    /// Returns true if the message should leave the inbox.
    #[must_use]
    pub const fn should_remove(&self) -> bool {
        matches!(self, Self::Remove(_))
    }

    /// The rule that produced this decision.
    #[must_use]
    pub const fn reason(&self) -> &Reason {
        match self {
            Self::Keep(reason) | Self::Remove(reason) => reason,
        }
    }
}

/// Counters over every decision an engine has made since the last reset.
///
/// `checked == removed + kept` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Messages evaluated.
    pub checked: u64,
    /// Messages marked for removal.
    pub removed: u64,
    /// Messages kept.
    pub kept: u64,
}

impl RunStats {
    /// Count one decision.
    pub const fn record(&mut self, decision: &Decision) {
        self.checked += 1;
        if decision.should_remove() {
            self.removed += 1;
        } else {
            self.kept += 1;
        }
    }
}
