//! Message triage: decide whether a message stays in the inbox.
//!
//! A [`TriageEngine`] applies a [`RuleConfig`](crate::rules::RuleConfig) to
//! [`MessageSummary`] values. Rules are evaluated as a strict chain and the
//! first match wins:
//!
//! 1. **Whitelist**: sender contains a whitelist entry, keep
//! 2. **Blacklist**: sender contains a blacklist entry, remove
//! 3. **Newsletter patterns**: subject or snippet contains a pattern, remove
//! 4. **Age**: message is older than `max_age_days` whole days, remove
//! 5. Otherwise keep
//!
//! All matching is case-insensitive substring containment.
//!
//! # Example
//!
//! ```ignore
//! use inbox_sanitizer_core::triage::{MessageSummary, TriageEngine};
//!
//! let mut engine = TriageEngine::new(RuleConfig::load("config/filters.yaml"));
//! let msg = MessageSummary::new("18c2f").with_sender("ads@spam.com");
//!
//! if engine.decide(&msg).should_remove() {
//!     // archive or delete
//! }
//! ```

mod engine;
mod model;

pub use engine::{TriageEngine, evaluate};
pub use model::{Decision, MessageId, MessageSummary, Reason, RunStats};
