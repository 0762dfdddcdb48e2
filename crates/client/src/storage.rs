//! Persisted client state.
//!
//! Two scopes, mirroring what a browser offers: [`Scope::Local`] survives
//! restarts (a JSON file in the storage directory), [`Scope::Session`] lives
//! as long as the [`ClientStorage`] value.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;

const LOCAL_FILE: &str = "local.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Session,
}

/// Keys the client persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    Token,
    /// The signed-in [`tavola_core::StaffUser`].
    User,
    /// Registration wizard fields entered so far.
    RegisterFormData,
    /// Registration wizard step to resume at.
    RegisterCurrentStep,
}

impl StorageKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::User => "user",
            Self::RegisterFormData => "registerFormData",
            Self::RegisterCurrentStep => "registerCurrentStep",
        }
    }
}

type Entries = BTreeMap<String, Value>;

/// Key/value store for client state.
#[derive(Debug)]
pub struct ClientStorage {
    local_path: PathBuf,
    session: Entries,
}

impl ClientStorage {
    /// Storage rooted at `dir`. Nothing is read or created until used.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            local_path: dir.as_ref().join(LOCAL_FILE),
            session: Entries::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.storage_dir)
    }

    fn read_local(&self) -> Result<Entries, ClientError> {
        match fs::read(&self.local_path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temporary file so a crash never leaves half a file.
    fn write_local(&self, entries: &Entries) -> Result<(), ClientError> {
        if let Some(dir) = self.local_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.local_path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.local_path)?;
        Ok(())
    }

    /// Read and decode a value. Missing keys give `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be read or the stored value
    /// has another shape.
    pub fn get<T: DeserializeOwned>(
        &self,
        scope: Scope,
        key: StorageKey,
    ) -> Result<Option<T>, ClientError> {
        let value = match scope {
            Scope::Local => self.read_local()?.remove(key.as_str()),
            Scope::Session => self.session.get(key.as_str()).cloned(),
        };
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or the local file
    /// cannot be written.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        scope: Scope,
        key: StorageKey,
        value: &T,
    ) -> Result<(), ClientError> {
        let value = serde_json::to_value(value)?;
        match scope {
            Scope::Local => {
                let mut entries = self.read_local()?;
                entries.insert(key.as_str().to_owned(), value);
                self.write_local(&entries)
            }
            Scope::Session => {
                self.session.insert(key.as_str().to_owned(), value);
                Ok(())
            }
        }
    }

    /// Remove keys from both scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be rewritten.
    pub fn remove(&mut self, keys: &[StorageKey]) -> Result<(), ClientError> {
        for key in keys {
            self.session.remove(key.as_str());
        }
        let mut entries = self.read_local()?;
        let before = entries.len();
        for key in keys {
            entries.remove(key.as_str());
        }
        if entries.len() != before {
            self.write_local(&entries)?;
        }
        Ok(())
    }

    /// Forget the signed-in user (on logout or session expiry).
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be rewritten.
    pub fn clear_auth(&mut self) -> Result<(), ClientError> {
        debug!("clearing stored credentials");
        self.remove(&[StorageKey::Token, StorageKey::User])
    }

    /// Forget the registration wizard draft (after a successful signup).
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be rewritten.
    pub fn clear_registration_draft(&mut self) -> Result<(), ClientError> {
        self.remove(&[StorageKey::RegisterFormData, StorageKey::RegisterCurrentStep])
    }
}
