use anyhow::Result;
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::auth::oauth::Authorizer;
use crate::auth::token_file::{self, OAuthToken};

/// Read-only access to the mailbox.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// How the token handed out by [`TokenManager::credentials`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cached,
    Refreshed,
    Authorized,
}

/// Keeps the token file current and hands out usable credentials.
pub struct TokenManager<A> {
    token_path: PathBuf,
    scopes: Vec<String>,
    authorizer: A,
}

impl<A: Authorizer> TokenManager<A> {
    pub fn new(token_path: impl Into<PathBuf>, authorizer: A) -> Self {
        Self {
            token_path: token_path.into(),
            scopes: vec![GMAIL_READONLY_SCOPE.to_string()],
            authorizer,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Returns a valid token; refreshes or runs the consent flow if needed.
    pub fn credentials(&self) -> Result<OAuthToken> {
        self.credentials_at(token_file::now_epoch())
            .map(|(token, _)| token)
    }

    pub fn credentials_at(&self, now: i64) -> Result<(OAuthToken, TokenSource)> {
        let cached = match token_file::load_token(&self.token_path) {
            Ok(t) => t,
            Err(e) => {
                warn!("ignoring unusable token file: {e}");
                None
            }
        };

        let (token, source) = match cached {
            // 1) cached & not expired
            Some(t) if t.is_valid(now) => {
                debug!("using cached token from {}", self.token_path.display());
                return Ok((t, TokenSource::Cached));
            }
            // 2) refresh if possible
            Some(t) if t.is_expired(now) && t.can_refresh() => {
                info!("access token expired, refreshing");
                (self.authorizer.refresh(&t)?, TokenSource::Refreshed)
            }
            // 3) otherwise ask the user
            _ => {
                info!("no usable token, starting consent flow");
                (self.authorizer.authorize(&self.scopes)?, TokenSource::Authorized)
            }
        };

        token_file::save_token(&self.token_path, &token)?;
        Ok((token, source))
    }
}
