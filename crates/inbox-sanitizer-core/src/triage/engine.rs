//! Rule evaluation.

use chrono::{DateTime, FixedOffset, Local};

use super::model::{Decision, MessageSummary, Reason, RunStats};
use crate::rules::RuleConfig;

/// Evaluate `message` against `config` as of `now`.
///
/// Rules are checked in a fixed order and the first match wins:
/// whitelist, blacklist, newsletter patterns, age, default keep.
#[must_use]
pub fn evaluate(
    config: &RuleConfig,
    message: &MessageSummary,
    now: DateTime<FixedOffset>,
) -> Decision {
    let sender = message.sender.to_lowercase();

    if let Some(entry) = first_contained(&config.whitelist, &sender) {
        return Decision::Keep(Reason::Whitelisted(entry.clone()));
    }

    if let Some(entry) = first_contained(&config.blacklist, &sender) {
        return Decision::Remove(Reason::Blacklisted(entry.clone()));
    }

    let text = format!("{} {}", message.subject, message.snippet).to_lowercase();
    if let Some(pattern) = first_contained(&config.newsletter_patterns, &text) {
        return Decision::Remove(Reason::Newsletter(pattern.clone()));
    }

    if let Some(received_at) = message.received_at {
        let age_days = (now - received_at).num_days();
        if age_days > i64::from(config.max_age_days) {
            return Decision::Remove(Reason::TooOld {
                max_age_days: config.max_age_days,
            });
        }
    }

    Decision::Keep(Reason::NoRulesMatched)
}

/// First entry (in configured order) whose case-folded form occurs in `haystack`.
fn first_contained<'a>(entries: &'a [String], haystack: &str) -> Option<&'a String> {
    entries
        .iter()
        .find(|entry| haystack.contains(&entry.to_lowercase()))
}

/// Applies a [`RuleConfig`] to messages and keeps [`RunStats`].
#[derive(Debug, Clone)]
pub struct TriageEngine {
    config: RuleConfig,
    stats: RunStats,
}

impl TriageEngine {
    /// Create an engine with zeroed counters.
    #[must_use]
    pub fn new(config: RuleConfig) -> Self {
        Self {
            config,
            stats: RunStats::default(),
        }
    }

    /// Decide one message using the local clock.
    pub fn decide(&mut self, message: &MessageSummary) -> Decision {
        self.decide_at(message, Local::now().fixed_offset())
    }

    /// Decide one message as of `now`, counting the result.
    pub fn decide_at(&mut self, message: &MessageSummary, now: DateTime<FixedOffset>) -> Decision {
        let decision = evaluate(&self.config, message, now);
        self.stats.record(&decision);
        decision
    }

    /// Counters since creation or the last reset.
    #[must_use]
    pub const fn stats(&self) -> RunStats {
        self.stats
    }

    /// Zero the counters.
    pub fn reset_stats(&mut self) {
        self.stats = RunStats::default();
    }

    /// The rules in use.
    #[must_use]
    pub const fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Swap in new rules between runs. Counters are left alone.
    pub fn reload(&mut self, config: RuleConfig) {
        self.config = config;
    }
}
