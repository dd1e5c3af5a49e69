use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::StoreError;

/// Seconds before the recorded expiry at which a token already counts as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth credentials as persisted in the token file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Epoch seconds in memory; `expiry` (RFC 3339, UTC) on disk.
    #[serde(
        default,
        rename = "expiry",
        alias = "expires_at_epoch",
        with = "expiry_format"
    )]
    pub expires_at_epoch: Option<i64>,
}

/// The provider writes `expiry` as `2024-05-01T12:00:00.000000Z`. Files from
/// older versions of this crate carry a plain epoch under `expires_at_epoch`.
mod expiry_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Epoch(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
        match value.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)) {
            Some(dt) => s.serialize_str(&dt.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<Repr>::deserialize(d)? {
            None => Ok(None),
            Some(Repr::Epoch(secs)) => Ok(Some(secs)),
            Some(Repr::Text(s)) => parse(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("unrecognised expiry `{s}`"))),
        }
    }

    fn parse(s: &str) -> Option<i64> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.timestamp());
        }
        // no offset at all: the provider means UTC
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|n| n.and_utc().timestamp())
    }
}

impl OAuthToken {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at_epoch
            .is_some_and(|exp| now >= exp - EXPIRY_SKEW_SECS)
    }

    pub fn is_valid(&self, now: i64) -> bool {
        self.token.is_some() && !self.is_expired(now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("has_token", &self.token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expires_at_epoch", &self.expires_at_epoch)
            .finish()
    }
}

pub fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn save_token(path: &Path, token: &OAuthToken) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let s = serde_json::to_string_pretty(token).map_err(|e| StoreError::encode(path, e))?;
    fs::write(path, s).map_err(|e| StoreError::io(path, e))?;
    debug!("token written to {}", path.display());
    Ok(())
}

/// Load the token file if present.
pub fn load_token(path: &Path) -> Result<Option<OAuthToken>, StoreError> {
    let s = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let token: OAuthToken = serde_json::from_str(&s).map_err(|e| StoreError::malformed(path, e))?;
    Ok(Some(token))
}
