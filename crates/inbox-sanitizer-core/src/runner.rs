//! One triage pass over a mailbox.

use tracing::{debug, info, warn};

use crate::gateway::{GatewayError, MailboxGateway};
use crate::rules::Action;
use crate::triage::{Decision, MessageId, TriageEngine};
use crate::{Error, Result};

/// Provider search used when no scope is configured.
pub const DEFAULT_SCOPE: &str = "in:inbox";

/// Subject characters shown per log line.
const SUBJECT_PREVIEW_CHARS: usize = 40;

/// Outcome of one batch.
///
/// `processed == removed + kept`. Skipped messages are not processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Messages that were decided.
    pub processed: u64,
    /// Messages removed (or that would be, in a dry run).
    pub removed: u64,
    /// Messages left in place, including failed dispositions.
    pub kept: u64,
    /// No dispositions were issued.
    pub dry_run: bool,
    /// Candidates that could not be fetched.
    pub skipped: u64,
    /// Remove decisions whose disposition failed.
    pub failed: u64,
    /// Decision for each processed message, in processing order.
    pub decisions: Vec<(MessageId, Decision)>,
}

/// Drives list, fetch, decide and dispose for one batch.
#[derive(Debug)]
pub struct BatchRunner<G> {
    gateway: G,
    engine: TriageEngine,
    scope: String,
}

impl<G: MailboxGateway> BatchRunner<G> {
    /// Create a runner over the inbox.
    #[must_use]
    pub fn new(gateway: G, engine: TriageEngine) -> Self {
        Self {
            gateway,
            engine,
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Use a different provider search for candidates.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// The candidate search.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The triage engine.
    #[must_use]
    pub const fn engine(&self) -> &TriageEngine {
        &self.engine
    }

    /// Mutable access to the triage engine, e.g. to reload rules.
    pub const fn engine_mut(&mut self) -> &mut TriageEngine {
        &mut self.engine
    }

    /// The mailbox gateway.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Triage up to `max` candidates.
    ///
    /// Failures on individual messages are logged and counted; they never
    /// abort the batch.
    ///
    /// # Errors
    ///
    /// Returns an error only if the provider rejects the credential while
    /// listing candidates.
    pub async fn run_once(&mut self, max: u32, dry_run: bool) -> Result<BatchResult> {
        let mut result = BatchResult {
            dry_run,
            ..BatchResult::default()
        };

        info!(scope = %self.scope, max, dry_run, "Checking mailbox");
        let candidates = match self.gateway.list_candidates(&self.scope, max).await {
            Ok(ids) => ids,
            Err(e @ GatewayError::Unauthorized(_)) => return Err(Error::Gateway(e)),
            Err(e) => {
                warn!("Error listing messages: {e}");
                Vec::new()
            }
        };

        if candidates.is_empty() {
            info!("No messages found");
            return Ok(result);
        }
        info!("Found {} messages", candidates.len());

        let action = self.engine.config().action;
        for id in candidates.iter().take(max as usize) {
            self.process(id, action, &mut result).await;
        }

        info!(
            processed = result.processed,
            removed = result.removed,
            kept = result.kept,
            skipped = result.skipped,
            failed = result.failed,
            "Batch complete"
        );
        Ok(result)
    }

    async fn process(&mut self, id: &MessageId, action: Action, result: &mut BatchResult) {
        let summary = match self.gateway.fetch_summary(id).await {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                debug!("Message {id} disappeared, skipping");
                result.skipped += 1;
                return;
            }
            Err(e) => {
                warn!("Error getting message {id}: {e}");
                result.skipped += 1;
                return;
            }
        };

        let decision = self.engine.decide(&summary);
        result.processed += 1;
        result.decisions.push((id.clone(), decision.clone()));

        let Decision::Remove(reason) = &decision else {
            debug!("Keeping {id}: {}", decision.reason());
            result.kept += 1;
            return;
        };

        let subject = summary.subject_preview(SUBJECT_PREVIEW_CHARS);
        if result.dry_run {
            info!("Would {action}: {subject} ({reason})");
            result.removed += 1;
            return;
        }

        match self.gateway.apply_disposition(id, action).await {
            Ok(()) => {
                info!("{}: {subject} ({reason})", action.past_tense());
                result.removed += 1;
            }
            Err(e) => {
                warn!("Error applying {action} to {id}: {e}");
                result.kept += 1;
                result.failed += 1;
            }
        }
    }
}
