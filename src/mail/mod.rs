pub mod decoders;
pub mod gmail_client;
pub mod inbox;

pub use gmail_client::{GmailClient, MailApi, RawMessage};
pub use inbox::{DEFAULT_MAX_RESULTS, list_recent_emails};
