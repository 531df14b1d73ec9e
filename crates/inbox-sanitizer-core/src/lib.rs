//! # inbox-sanitizer-core
//!
//! Core logic for `inbox-sanitizer`, a rule-driven Gmail inbox cleaner.
//!
//! This crate provides:
//! - **Rules**: YAML rule file with whitelist, blacklist, newsletter patterns,
//!   age threshold and disposition
//! - **Triage**: a pure, first-match-wins rule chain over message summaries
//! - **Gateway**: the mailbox operations triage needs, with a Gmail REST
//!   implementation
//! - **Runner**: one list/fetch/decide/dispose pass with per-message isolation
//! - **Scheduler**: periodic runs on a fixed grid with cooperative shutdown
//! - **Auth**: client secrets, token storage and refresh

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
mod error;
pub mod gateway;
pub mod rules;
pub mod runner;
pub mod scheduler;
pub mod triage;

pub use auth::{AuthMode, Authorizer, ClientSecrets, CredentialError, TokenStore};
pub use error::{Error, Result};
pub use gateway::{AccessTokenSource, GatewayError, GmailGateway, MailboxGateway, Profile};
pub use rules::{Action, RuleConfig};
pub use runner::{BatchResult, BatchRunner};
pub use scheduler::{ScheduleConfig, Scheduler, Shutdown};
pub use triage::{Decision, MessageId, MessageSummary, Reason, RunStats, TriageEngine};
