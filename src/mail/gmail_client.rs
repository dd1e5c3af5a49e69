use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::auth::{Authorizer, TokenManager};
use crate::config::DEFAULT_GMAIL_API_BASE;

/// One message as returned by `messages.get?format=raw`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawMessage {
    pub id: String,
    /// base64url-encoded RFC 822 message
    pub raw: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListMessagesResponse {
    // absent when the label is empty
    messages: Option<Vec<MessageRef>>,
}

/// The two mailbox calls the inbox listing needs.
#[cfg_attr(test, mockall::automock)]
pub trait MailApi {
    fn list_message_ids(&self, label: &str, max_results: u32) -> Result<Vec<String>>;
    fn get_raw_message(&self, id: &str) -> Result<RawMessage>;
}

/// Authenticated handle on the Gmail REST API for the signed-in user.
pub struct GmailClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_GMAIL_API_BASE, access_token)
    }

    pub fn with_base_url(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Gets usable credentials from `tokens` (refreshing or asking the user as
    /// needed) and opens a session with them.
    pub fn connect<A: Authorizer>(tokens: &TokenManager<A>, base_url: &str) -> Result<Self> {
        let creds = tokens.credentials()?;
        let access = creds
            .token
            .ok_or_else(|| anyhow!("authorizer returned a token without an access token"))?;
        Ok(Self::with_base_url(base_url, access))
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/users/me/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("Gmail API returned HTTP {status} for {url}: {body}"));
        }
        debug!("Gmail API {url}: {status}");

        response
            .json::<T>()
            .with_context(|| format!("unexpected response body from {url}"))
    }
}

impl MailApi for GmailClient {
    fn list_message_ids(&self, label: &str, max_results: u32) -> Result<Vec<String>> {
        let list: ListMessagesResponse = self.get_json(
            "messages",
            &[
                ("labelIds", label.to_string()),
                ("maxResults", max_results.to_string()),
            ],
        )?;
        Ok(list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .collect())
    }

    fn get_raw_message(&self, id: &str) -> Result<RawMessage> {
        self.get_json(&format!("messages/{id}"), &[("format", "raw".to_string())])
    }
}
