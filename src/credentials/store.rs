use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// One email address + password pair, stored as `{"email": .., "password": ..}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(rename = "email")]
    pub email_address: String,
    pub password: String,
}

impl StoredCredential {
    pub fn new(email_address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email_address: email_address.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("email_address", &self.email_address)
            .field("password", &"<redacted>")
            .finish()
    }
}

// Both keys optional on the way in so a half-written file can be told apart
// from a syntactically broken one.
#[derive(Deserialize)]
struct CredentialFile {
    email: Option<String>,
    password: Option<String>,
}

/// Persists a single [`StoredCredential`] in a JSON file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the file with the given pair.
    pub fn save(&self, email_address: &str, password: &str) -> Result<(), StoreError> {
        let cred = StoredCredential::new(email_address, password);
        self.write(&cred).inspect_err(|e| error!("saving credentials failed: {e}"))
    }

    fn write(&self, cred: &StoredCredential) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let s = serde_json::to_string_pretty(cred)
            .map_err(|e| StoreError::encode(&self.path, e))?;
        fs::write(&self.path, s).map_err(|e| StoreError::io(&self.path, e))?;
        debug!("credentials written to {}", self.path.display());
        Ok(())
    }

    /// `Ok(None)` when nothing was ever saved. A file that exists but cannot
    /// be used is an error, logged before it is returned.
    pub fn load(&self) -> Result<Option<StoredCredential>, StoreError> {
        self.read()
            .inspect_err(|e| warn!("loading credentials failed: {e}"))
    }

    fn read(&self) -> Result<Option<StoredCredential>, StoreError> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let file: CredentialFile =
            serde_json::from_str(&s).map_err(|e| StoreError::malformed(&self.path, e))?;

        let email_address = file.email.ok_or_else(|| StoreError::MissingField {
            path: self.path.clone(),
            field: "email",
        })?;
        let password = file.password.ok_or_else(|| StoreError::MissingField {
            path: self.path.clone(),
            field: "password",
        })?;

        Ok(Some(StoredCredential {
            email_address,
            password,
        }))
    }

    /// Like [`load`](Self::load) but any failure reads as "nothing stored".
    pub fn load_or_absent(&self) -> Option<StoredCredential> {
        self.load().ok().flatten()
    }
}
