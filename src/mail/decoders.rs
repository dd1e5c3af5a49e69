use anyhow::{Context, Result};
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use mailparse::MailHeaderMap;

use crate::domain::email::EmailSummary;

/// base64url that accepts the payload with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn decode_raw_message(encoded: &str) -> Result<Vec<u8>> {
    URL_SAFE_LENIENT
        .decode(encoded.trim())
        .context("raw message is not valid base64url")
}

/// Subject and From come from the parsed headers (RFC 2047 decoded by
/// mailparse); the snippet is whatever the server supplied.
pub fn summarize_rfc822(raw_rfc822: &[u8], snippet: Option<&str>) -> Result<EmailSummary> {
    let parsed = mailparse::parse_mail(raw_rfc822).context("message is not valid MIME")?;

    Ok(EmailSummary {
        subject: parsed.headers.get_first_value("Subject").unwrap_or_default(),
        from: parsed.headers.get_first_value("From").unwrap_or_default(),
        snippet: snippet.unwrap_or_default().to_string(),
    })
}
