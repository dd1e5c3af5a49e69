use anyhow::{Context, Result, anyhow};
use log::debug;

use crate::domain::email::EmailSummary;
use crate::mail::decoders::{decode_raw_message, summarize_rfc822};
use crate::mail::gmail_client::{MailApi, RawMessage};

pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const INBOX_LABEL: &str = "INBOX";

/// Summaries of up to `max_results` inbox messages, in the order the server
/// listed them. The first message that cannot be fetched or parsed fails the
/// whole call.
pub fn list_recent_emails(api: &impl MailApi, max_results: u32) -> Result<Vec<EmailSummary>> {
    let ids = api.list_message_ids(INBOX_LABEL, max_results)?;
    debug!("{} message ids in {INBOX_LABEL}", ids.len());

    let mut out = Vec::with_capacity(ids.len());
    for id in &ids {
        let msg = api
            .get_raw_message(id)
            .with_context(|| format!("fetching message {id}"))?;
        out.push(summarize(&msg).with_context(|| format!("parsing message {id}"))?);
    }
    Ok(out)
}

fn summarize(msg: &RawMessage) -> Result<EmailSummary> {
    let raw = msg
        .raw
        .as_deref()
        .ok_or_else(|| anyhow!("response has no raw payload"))?;
    let bytes = decode_raw_message(raw)?;
    summarize_rfc822(&bytes, msg.snippet.as_deref())
}
