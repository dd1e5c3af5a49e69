use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};
use url::Url;

use crate::auth::client_secrets::{ClientSecrets, GOOGLE_AUTH_URI};
use crate::auth::token_file::{OAuthToken, now_epoch};
use crate::config::Config;

/// Anything that can hand out OAuth credentials: interactively for a fresh
/// grant, or by trading a refresh token.
#[cfg_attr(test, mockall::automock)]
pub trait Authorizer {
    /// Runs a consent flow and returns a brand-new token.
    fn authorize(&self, scopes: &[String]) -> Result<OAuthToken>;

    /// Exchanges `token.refresh_token` for a new access token.
    fn refresh(&self, token: &OAuthToken) -> Result<OAuthToken>;
}

/// Installed-application flow against Google: loopback redirect + PKCE.
#[derive(Debug, Clone)]
pub struct GoogleAuthorizer {
    pub client_secret_path: PathBuf,
    pub timeout: Duration,
}

impl GoogleAuthorizer {
    pub fn new(client_secret_path: impl Into<PathBuf>) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            client_secret_path: cfg.client_secret_path.clone(),
            timeout: Duration::from_secs(cfg.consent_timeout_secs),
        }
    }
}

fn basic_client(
    client_id: &str,
    client_secret: Option<&str>,
    auth_uri: &str,
    token_uri: &str,
) -> Result<BasicClient> {
    Ok(BasicClient::new(
        ClientId::new(client_id.to_string()),
        client_secret.map(|s| ClientSecret::new(s.to_string())),
        AuthUrl::new(auth_uri.to_string())?,
        Some(TokenUrl::new(token_uri.to_string())?),
    ))
}

fn expiry_from(expires_in: Option<Duration>) -> Option<i64> {
    expires_in.map(|d| now_epoch() + d.as_secs() as i64)
}

/// Waits for the browser to hit the loopback listener and returns the
/// authorization code, provided the `state` matches.
fn wait_for_code(server: &Server, expected_state: &str, timeout: Duration) -> Result<String> {
    let wait_until = Instant::now() + timeout;

    while Instant::now() < wait_until {
        let Ok(maybe_request) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };
        let Some(request) = maybe_request else {
            continue;
        };

        // request.url() is only path + query
        let Ok(parsed) = Url::parse(&format!("http://127.0.0.1{}", request.url())) else {
            let _ = request.respond(Response::from_string("Bad redirect"));
            continue;
        };

        let mut code = None;
        let mut state = None;
        let mut denied = None;
        for (k, v) in parsed.query_pairs() {
            match &*k {
                "code" => code = Some(v.into_owned()),
                "state" => state = Some(v.into_owned()),
                "error" => denied = Some(v.into_owned()),
                _ => {}
            }
        }

        if let Some(reason) = denied {
            let _ = request.respond(Response::from_string(
                "Authorization was not granted. You can close this tab.",
            ));
            return Err(anyhow!("authorization denied: {reason}"));
        }

        match (code, state) {
            (Some(code), Some(state)) if state == expected_state => {
                let _ = request.respond(Response::from_string(
                    "Authorization received. You can close this tab.",
                ));
                return Ok(code);
            }
            (Some(_), _) => {
                let _ = request.respond(Response::from_string("State mismatch."));
                return Err(anyhow!("OAuth state mismatch in redirect"));
            }
            _ => {
                // favicon and the like
                let _ = request.respond(Response::from_string("No code found in redirect."));
            }
        }
    }

    Err(anyhow!("no authorization code received within {timeout:?}"))
}

impl Authorizer for GoogleAuthorizer {
    fn authorize(&self, scopes: &[String]) -> Result<OAuthToken> {
        let secrets = ClientSecrets::load(&self.client_secret_path)?;

        // Listen first so the redirect can never arrive before we are ready.
        let server = Server::http("127.0.0.1:0")
            .map_err(|e| anyhow!("failed to bind OAuth callback server: {e}"))?;
        let port = server.server_addr().port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");

        let oauth_client = basic_client(
            &secrets.client_id,
            secrets.client_secret.as_deref(),
            &secrets.auth_uri,
            &secrets.token_uri,
        )?
        .set_redirect_uri(RedirectUrl::new(redirect_uri)?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = oauth_client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        println!("Open this URL in your browser:\n{auth_url}");
        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("could not open browser automatically: {e}");
        }

        let code = wait_for_code(&server, csrf_token.secret(), self.timeout)?;
        debug!("authorization code received on port {port}");

        let token = oauth_client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request(http_client)
            .context("token exchange failed")?;

        let granted = token
            .scopes()
            .map(|s| s.iter().map(|s| s.as_str().to_owned()).collect())
            .unwrap_or_else(|| scopes.to_vec());

        info!("obtained new OAuth token");
        Ok(OAuthToken {
            token: Some(token.access_token().secret().to_string()),
            refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
            token_uri: secrets.token_uri,
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            scopes: granted,
            expires_at_epoch: expiry_from(token.expires_in()),
        })
    }

    fn refresh(&self, current: &OAuthToken) -> Result<OAuthToken> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or_else(|| anyhow!("token has no refresh token"))?;

        let oauth_client = basic_client(
            &current.client_id,
            current.client_secret.as_deref(),
            GOOGLE_AUTH_URI,
            &current.token_uri,
        )?;

        let token = oauth_client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request(http_client)
            .context("refreshing access token failed")?;

        info!("refreshed OAuth access token");
        Ok(OAuthToken {
            token: Some(token.access_token().secret().to_string()),
            // Google usually omits the refresh token on refresh; keep ours.
            refresh_token: token
                .refresh_token()
                .map(|r| r.secret().to_string())
                .or_else(|| current.refresh_token.clone()),
            expires_at_epoch: expiry_from(token.expires_in()),
            ..current.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;

    fn hit(port: u16, path_and_query: &str) -> String {
        let mut s = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(
            s,
            "GET {path_and_query} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n"
        )
        .unwrap();
        let mut out = String::new();
        s.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn callback_with_matching_state_yields_code() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().port();
        let browser = thread::spawn(move || {
            hit(port, "/favicon.ico");
            hit(port, "/?state=abc&code=the-code&scope=x")
        });

        let code = wait_for_code(&server, "abc", Duration::from_secs(10)).unwrap();
        assert_eq!(code, "the-code");
        assert!(browser.join().unwrap().contains("Authorization received"));
    }

    #[test]
    fn callback_with_wrong_state_is_rejected() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().port();
        let browser = thread::spawn(move || hit(port, "/?state=evil&code=the-code"));

        let err = wait_for_code(&server, "abc", Duration::from_secs(10)).unwrap_err();
        assert!(err.to_string().contains("state mismatch"));
        browser.join().unwrap();
    }

    #[test]
    fn denied_consent_is_an_error() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().port();
        let browser = thread::spawn(move || hit(port, "/?error=access_denied&state=abc"));

        let err = wait_for_code(&server, "abc", Duration::from_secs(10)).unwrap_err();
        assert!(err.to_string().contains("access_denied"));
        browser.join().unwrap();
    }

    #[test]
    fn nothing_arrives_before_timeout() {
        let server = Server::http("127.0.0.1:0").unwrap();
        assert!(wait_for_code(&server, "abc", Duration::from_millis(600)).is_err());
    }

    #[test]
    fn refresh_without_refresh_token_fails_fast() {
        let auth = GoogleAuthorizer::new("unused.json");
        let token = OAuthToken {
            token: Some("at".into()),
            refresh_token: None,
            token_uri: "http://127.0.0.1:9/token".into(),
            client_id: "cid".into(),
            client_secret: None,
            scopes: vec![],
            expires_at_epoch: Some(0),
        };
        assert!(auth.refresh(&token).is_err());
    }
}
