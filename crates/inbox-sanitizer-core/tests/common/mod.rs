//! In-memory mailbox shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use inbox_sanitizer_core::{Action, GatewayError, MailboxGateway, MessageId, MessageSummary};

/// Failure to inject into the next listing call.
#[derive(Debug, Clone, Copy)]
pub enum ListFailure {
    Unauthorized,
    Unavailable,
}

#[derive(Default)]
struct State {
    messages: Vec<MessageSummary>,
    inbox: Vec<MessageId>,
    vanished: HashSet<MessageId>,
    broken_fetch: HashSet<MessageId>,
    broken_disposition: HashSet<MessageId>,
    list_failures: VecDeque<ListFailure>,
    list_delay: Duration,
    list_calls: Vec<(Instant, String, u32)>,
    dispositions: Vec<(MessageId, Action)>,
}

/// Mailbox whose state is shared between clones, so a test can keep a handle
/// while the runner owns another.
#[derive(Clone, Default)]
pub struct MockMailbox {
    state: Arc<Mutex<State>>,
}

impl MockMailbox {
    pub fn with_messages(messages: Vec<MessageSummary>) -> Self {
        let mailbox = Self::default();
        {
            let mut state = mailbox.state.lock().unwrap();
            state.inbox = messages.iter().map(|m| m.id.clone()).collect();
            state.messages = messages;
        }
        mailbox
    }

    pub fn vanish(&self, id: &str) {
        self.state.lock().unwrap().vanished.insert(MessageId::new(id));
    }

    pub fn break_fetch(&self, id: &str) {
        self.state.lock().unwrap().broken_fetch.insert(MessageId::new(id));
    }

    pub fn break_disposition(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .broken_disposition
            .insert(MessageId::new(id));
    }

    pub fn fail_next_list(&self, failure: ListFailure) {
        self.state.lock().unwrap().list_failures.push_back(failure);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state.lock().unwrap().list_delay = delay;
    }

    pub fn inbox(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .inbox
            .iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    pub fn messages(&self) -> Vec<MessageSummary> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn dispositions(&self) -> Vec<(String, Action)> {
        self.state
            .lock()
            .unwrap()
            .dispositions
            .iter()
            .map(|(id, action)| (id.as_str().to_string(), *action))
            .collect()
    }

    /// Seconds after `start` at which each listing call began.
    pub fn list_offsets(&self, start: Instant) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .list_calls
            .iter()
            .map(|(at, _, _)| at.duration_since(start).as_secs())
            .collect()
    }

    pub fn list_requests(&self) -> Vec<(String, u32)> {
        self.state
            .lock()
            .unwrap()
            .list_calls
            .iter()
            .map(|(_, scope, limit)| (scope.clone(), *limit))
            .collect()
    }
}

#[async_trait]
impl MailboxGateway for MockMailbox {
    async fn list_candidates(
        &self,
        scope: &str,
        limit: u32,
    ) -> Result<Vec<MessageId>, GatewayError> {
        let (delay, failure, ids) = {
            let mut state = self.state.lock().unwrap();
            state
                .list_calls
                .push((Instant::now(), scope.to_string(), limit));
            let ids: Vec<MessageId> = state.inbox.iter().take(limit as usize).cloned().collect();
            (state.list_delay, state.list_failures.pop_front(), ids)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match failure {
            Some(ListFailure::Unauthorized) => {
                Err(GatewayError::Unauthorized("token revoked".into()))
            }
            Some(ListFailure::Unavailable) => Err(GatewayError::Api {
                status: 503,
                message: "backend unavailable".into(),
            }),
            None => Ok(ids),
        }
    }

    async fn fetch_summary(&self, id: &MessageId) -> Result<Option<MessageSummary>, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.broken_fetch.contains(id) {
            return Err(GatewayError::Api {
                status: 500,
                message: "internal error".into(),
            });
        }
        if state.vanished.contains(id) {
            return Ok(None);
        }
        Ok(state.messages.iter().find(|m| &m.id == id).cloned())
    }

    async fn apply_disposition(&self, id: &MessageId, action: Action) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.broken_disposition.contains(id) {
            return Err(GatewayError::Api {
                status: 500,
                message: "modify failed".into(),
            });
        }
        state.dispositions.push((id.clone(), action));
        state.inbox.retain(|m| m != id);
        if action == Action::Delete {
            state.messages.retain(|m| &m.id != id);
        }
        Ok(())
    }
}

/// A message with no date, so only sender and text rules apply.
pub fn message(id: &str, sender: &str, subject: &str) -> MessageSummary {
    MessageSummary::new(id)
        .with_sender(sender)
        .with_subject(subject)
}
