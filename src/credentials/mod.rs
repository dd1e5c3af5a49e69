pub mod login;
pub mod store;

pub use login::ImapLogin;
pub use store::{CredentialStore, StoredCredential};
