use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_IMAP_SERVER: &str = "imap.gmail.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_LANGUAGE: &str = "de";
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Every path and endpoint the helpers touch. Components get their values
/// from here at construction time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub client_secret_path: PathBuf,
    pub locales_dir: PathBuf,
    pub imap_server: String,
    pub imap_port: u16,
    pub language: String,
    pub gmail_api_base: String,
    pub consent_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            client_secret_path: PathBuf::from("client_secret.json"),
            locales_dir: PathBuf::from("locales"),
            imap_server: DEFAULT_IMAP_SERVER.to_string(),
            imap_port: DEFAULT_IMAP_PORT,
            language: DEFAULT_LANGUAGE.to_string(),
            gmail_api_base: DEFAULT_GMAIL_API_BASE.to_string(),
            consent_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Resolves the relative file paths against `dir`. Absolute paths are
    /// left alone.
    pub fn rooted_at(mut self, dir: &Path) -> Self {
        for p in [
            &mut self.credentials_path,
            &mut self.token_path,
            &mut self.client_secret_path,
            &mut self.locales_dir,
        ] {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        }
        self
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("mail_helpers"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Reads the TOML config at `path`. A missing file is not an error: the
/// defaults are used instead.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: Config = toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}
