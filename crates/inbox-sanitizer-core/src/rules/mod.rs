//! Rule configuration.
//!
//! Rules are read from a YAML file shaped like:
//!
//! ```yaml
//! whitelist: ["@work.com"]          # always keep
//! blacklist: ["@spam.com"]          # always remove
//! newsletter_patterns: [unsubscribe, newsletter]
//! max_age_days: 30
//! action: archive                   # or delete
//! ```
//!
//! Precedence is fixed: whitelist, then blacklist, then newsletter patterns,
//! then age.

mod config;

pub use config::{Action, DEFAULT_MAX_AGE_DAYS, DEFAULT_NEWSLETTER_PATTERNS, RuleConfig};
