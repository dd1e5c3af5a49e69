use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// UI strings for one language, loaded from `<locales_dir>/<code>.json`.
///
/// Unknown keys translate to themselves, so a missing or broken language file
/// degrades to untranslated text instead of an error.
#[derive(Debug, Clone)]
pub struct Translator {
    locales_dir: PathBuf,
    language: String,
    table: HashMap<String, String>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Translator {
    pub fn new(locales_dir: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        let locales_dir = locales_dir.into();
        let language = language.into();
        let table = load_table(&locales_dir, &language);
        Self {
            locales_dir,
            language,
            table,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.locales_dir.clone(), cfg.language.clone())
    }

    pub fn locales_dir(&self) -> &Path {
        &self.locales_dir
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn lookup<'a>(&'a self, key: &'a str) -> &'a str {
        self.table.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Switches language. The previous table is dropped, not merged.
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
        self.table = load_table(&self.locales_dir, &self.language);
    }

    /// Language codes that have a file in the locales directory, sorted.
    pub fn available_languages(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.locales_dir) else {
            return vec![];
        };
        let mut codes: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        codes.sort();
        codes
    }
}

fn language_file(locales_dir: &Path, language: &str) -> PathBuf {
    locales_dir.join(format!("{language}.json"))
}

fn load_table(locales_dir: &Path, language: &str) -> HashMap<String, String> {
    let path = language_file(locales_dir, language);
    let s = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("language file not found: {}", path.display());
            return HashMap::new();
        }
        Err(e) => {
            warn!("could not read language file {}: {e}", path.display());
            return HashMap::new();
        }
    };
    match serde_json::from_str::<HashMap<String, String>>(&s) {
        Ok(table) => {
            debug!("loaded {} strings for '{language}'", table.len());
            table
        }
        Err(e) => {
            warn!("ignoring malformed language file {}: {e}", path.display());
            HashMap::new()
        }
    }
}
