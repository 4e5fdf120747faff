//! Fail-soft session store.
//!
//! Wraps a [`SessionBackend`] with the policy the bot relies on:
//! `load` never fails (any problem means "no session"), `save` refuses
//! invalid credentials before touching the backend, and `clear` treats a
//! missing row as success.

use atende_core::{error::AtendeError, session::SessionCredentials, traits::SessionBackend};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Session persistence for one bot, addressed by a fixed key.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    key: String,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>, key: &str) -> Self {
        Self {
            backend,
            key: key.to_string(),
        }
    }

    /// The fixed row id this store reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Load stored credentials. `None` on missing row, backend error, or
    /// malformed data; the cause is logged.
    pub async fn load(&self) -> Option<SessionCredentials> {
        let blob = match self.backend.fetch(&self.key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                info!("no stored session for '{}', a new QR login is needed", self.key);
                return None;
            }
            Err(e) => {
                warn!("failed to load session '{}': {e}", self.key);
                return None;
            }
        };

        match SessionCredentials::from_blob(&blob) {
            Ok(creds) => {
                info!("loaded stored session '{}' from {}", self.key, self.backend.name());
                Some(creds)
            }
            Err(e) => {
                warn!("ignoring stored session '{}': {e}", self.key);
                None
            }
        }
    }

    /// Validate and persist credentials, overwriting any previous value.
    pub async fn save(&self, creds: &SessionCredentials) -> Result<(), AtendeError> {
        if let Err(e) = creds.validate() {
            error!("refusing to save session '{}': {e}", self.key);
            return Err(e);
        }
        let blob = creds.to_blob()?;
        self.backend.upsert(&self.key, &blob).await.map_err(|e| {
            error!("failed to save session '{}': {e}", self.key);
            e
        })?;
        info!("session '{}' saved to {}", self.key, self.backend.name());
        Ok(())
    }

    /// Remove stored credentials. A missing row is not an error.
    pub async fn clear(&self) -> Result<(), AtendeError> {
        self.backend.delete(&self.key).await.map_err(|e| {
            error!("failed to clear session '{}': {e}", self.key);
            e
        })?;
        info!("session '{}' cleared", self.key);
        Ok(())
    }

    /// Connectivity probe: `Ok(true)` when the table has rows, `Ok(false)`
    /// when it is reachable but empty.
    pub async fn ping(&self) -> Result<bool, AtendeError> {
        self.backend.has_rows().await
    }

    /// Write placeholder credentials if no row exists for this key yet.
    /// Returns whether a row was written.
    pub async fn seed_placeholder(&self) -> Result<bool, AtendeError> {
        if self.backend.fetch(&self.key).await?.is_some() {
            return Ok(false);
        }
        let blob = SessionCredentials::placeholder().to_blob()?;
        self.backend.upsert(&self.key, &blob).await?;
        info!("seeded placeholder session '{}'", self.key);
        Ok(true)
    }
}
