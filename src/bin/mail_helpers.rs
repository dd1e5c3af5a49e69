use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mail_helpers::auth::{GoogleAuthorizer, TokenManager};
use mail_helpers::config::{Config, default_config_path, load_config};
use mail_helpers::credentials::{CredentialStore, ImapLogin};
use mail_helpers::i18n::Translator;
use mail_helpers::mail::{DEFAULT_MAX_RESULTS, GmailClient, list_recent_emails};

#[derive(Parser)]
#[command(name = "mail_helpers")]
#[command(about = "Gmail login check, inbox preview and UI string lookup", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an email address; the password is read from stdin
    SaveCredentials { email: String },

    /// Try an IMAP login with the stored credentials
    TestLogin,

    /// Show the most recent inbox messages (OAuth, read-only)
    Inbox {
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max: u32,
    },

    /// Translate a key
    Translate {
        key: String,

        /// Language code (defaults to the configured one)
        #[arg(long)]
        lang: Option<String>,
    },

    /// List languages that have a dictionary file
    Languages,
}

/// Drops the newline the terminal adds; spaces belong to the password.
fn strip_line_ending(input: &str) -> &str {
    input.trim_end_matches(['\r', '\n'])
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(p) => p,
        None => default_config_path()?,
    };
    let cfg: Config = load_config(&config_path)?;

    match cli.cmd {
        Command::SaveCredentials { email } => {
            eprintln!("Password (end with Ctrl-D):");
            let mut password = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut password)?;
            CredentialStore::new(&cfg.credentials_path).save(&email, strip_line_ending(&password))?;
            println!("Saved credentials for {email}");
            Ok(())
        }

        Command::TestLogin => {
            let cred = CredentialStore::new(&cfg.credentials_path)
                .load()?
                .ok_or_else(|| anyhow!("no credentials saved yet, run save-credentials first"))?;
            if ImapLogin::from_config(&cfg).test_login(&cred.email_address, &cred.password) {
                println!("Login OK");
                Ok(())
            } else {
                Err(anyhow!("login failed for {}", cred.email_address))
            }
        }

        Command::Inbox { max } => {
            let tokens = TokenManager::new(&cfg.token_path, GoogleAuthorizer::from_config(&cfg));
            let gmail = GmailClient::connect(&tokens, &cfg.gmail_api_base)?;
            for email in list_recent_emails(&gmail, max)? {
                println!("{}\n  {}\n  {}\n", email.from, email.subject, email.snippet);
            }
            Ok(())
        }

        Command::Translate { key, lang } => {
            let translator = Translator::new(&cfg.locales_dir, lang.unwrap_or(cfg.language));
            println!("{}", translator.lookup(&key));
            Ok(())
        }

        Command::Languages => {
            let translator = Translator::from_config(&cfg);
            for code in translator.available_languages() {
                let marker = if code == translator.language() { "*" } else { " " };
                println!("{marker} {code}");
            }
            Ok(())
        }
    }
}
