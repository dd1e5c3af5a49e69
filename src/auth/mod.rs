pub mod client_secrets;
pub mod oauth;
pub mod token_file;
pub mod token_manager;

pub use oauth::{Authorizer, GoogleAuthorizer};
pub use token_file::OAuthToken;
pub use token_manager::{GMAIL_READONLY_SCOPE, TokenManager, TokenSource};
