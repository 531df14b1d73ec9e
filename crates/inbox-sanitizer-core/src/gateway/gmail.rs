//! Gmail REST API gateway.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{AccessTokenSource, GatewayError, MailboxGateway};
use crate::rules::Action;
use crate::triage::{MessageId, MessageSummary};

/// Gmail API root for the authorized user.
pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Gmail refuses `maxResults` above this.
const MAX_PAGE_SIZE: u32 = 500;

/// Headers requested with `format=metadata`.
const METADATA_HEADERS: [&str; 3] = ["From", "Subject", "Date"];

/// Mailbox gateway backed by the Gmail REST API.
#[derive(Clone)]
pub struct GmailGateway {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl std::fmt::Debug for GmailGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Mailbox profile of the authorized user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Primary address.
    pub email_address: String,
    /// Total messages in the mailbox.
    #[serde(default)]
    pub messages_total: u64,
    /// Total threads in the mailbox.
    #[serde(default)]
    pub threads_total: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl MessageResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn into_summary(self) -> MessageSummary {
        let sender = self.header("From").unwrap_or_default().to_string();
        let subject = self.header("Subject").unwrap_or_default().to_string();
        let date = self.header("Date").unwrap_or_default().to_string();
        MessageSummary::new(self.id)
            .with_sender(sender)
            .with_subject(subject)
            .with_snippet(self.snippet)
            .with_date_header(&date)
    }
}

impl GmailGateway {
    /// Create a gateway against the public Gmail endpoint.
    #[must_use]
    pub fn new(tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tokens,
        }
    }

    /// Point the gateway at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Fetch the mailbox profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the credential is rejected.
    pub async fn profile(&self) -> Result<Profile, GatewayError> {
        let request = self.http.get(self.url("profile"));
        let response = Self::check(self.authorized(request).await?).await?;
        Self::decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_auth(token).send().await?)
    }

    /// Map non-success statuses to errors.
    async fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);

        if status == StatusCode::UNAUTHORIZED {
            Err(GatewayError::Unauthorized(message))
        } else {
            Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn archive(&self, id: &MessageId) -> Result<(), GatewayError> {
        let request = self
            .http
            .post(self.url(&format!("messages/{id}/modify")))
            .json(&serde_json::json!({ "removeLabelIds": ["INBOX"] }));
        let response = self.authorized(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(id.clone()));
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &MessageId) -> Result<(), GatewayError> {
        let request = self.http.delete(self.url(&format!("messages/{id}")));
        let response = self.authorized(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Message {id} already gone");
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl MailboxGateway for GmailGateway {
    async fn list_candidates(
        &self,
        scope: &str,
        limit: u32,
    ) -> Result<Vec<MessageId>, GatewayError> {
        let limit = limit as usize;
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < limit {
            let remaining = limit - ids.len();
            let page_size = remaining.min(MAX_PAGE_SIZE as usize).to_string();
            let mut request = self
                .http
                .get(self.url("messages"))
                .query(&[("q", scope), ("maxResults", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = Self::check(self.authorized(request).await?).await?;
            let page: ListResponse = Self::decode(response).await?;
            ids.extend(
                page.messages
                    .into_iter()
                    .take(remaining)
                    .map(|m| MessageId::new(m.id)),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = ids.len(), scope, "Listed candidates");
        Ok(ids)
    }

    async fn fetch_summary(&self, id: &MessageId) -> Result<Option<MessageSummary>, GatewayError> {
        let mut query: Vec<(&str, &str)> = vec![("format", "metadata")];
        query.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", *h)));
        let request = self
            .http
            .get(self.url(&format!("messages/{id}")))
            .query(&query);

        let response = self.authorized(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let message: MessageResponse = Self::decode(Self::check(response).await?).await?;
        Ok(Some(message.into_summary()))
    }

    async fn apply_disposition(&self, id: &MessageId, action: Action) -> Result<(), GatewayError> {
        match action {
            Action::Archive => self.archive(id).await,
            Action::Delete => self.delete(id).await,
        }
    }
}
