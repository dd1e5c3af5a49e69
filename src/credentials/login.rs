use anyhow::Result;
use log::{info, warn};
use native_tls::TlsConnector;

use crate::config::Config;

/// One-shot IMAP login check: connect, LOGIN, LOGOUT.
#[derive(Debug, Clone)]
pub struct ImapLogin {
    pub server: String,
    pub port: u16,
}

impl ImapLogin {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.imap_server.clone(), cfg.imap_port)
    }

    /// Returns whether the server accepted the credentials. Every failure is
    /// logged and reported as `false`.
    pub fn test_login(&self, email_address: &str, password: &str) -> bool {
        match self.try_login(email_address, password) {
            Ok(()) => {
                info!("IMAP login to {} succeeded", self.server);
                true
            }
            Err(e) => {
                if is_rejection(&e) {
                    warn!("IMAP login rejected by {}: {e}", self.server);
                } else {
                    warn!("IMAP error talking to {}:{}: {e}", self.server, self.port);
                }
                false
            }
        }
    }

    fn try_login(&self, email_address: &str, password: &str) -> Result<()> {
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect(
            (self.server.as_str(), self.port),
            self.server.as_str(),
            &tls,
        )?;
        let mut session = client.login(email_address, password).map_err(|(e, _)| e)?;
        session.logout()?;
        Ok(())
    }
}

/// The server answered and said no (`NO` / `BAD`), as opposed to the
/// connection or TLS layer failing.
fn is_rejection(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<imap::error::Error>(),
        Some(imap::error::Error::No(_) | imap::error::Error::Bad(_))
    )
}
