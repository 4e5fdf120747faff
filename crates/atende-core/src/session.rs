//! WhatsApp Web session credentials.
//!
//! The automation client hands these out after a successful pairing and
//! accepts them back on startup to resume without a new QR scan.

use crate::error::AtendeError;
use serde::{Deserialize, Serialize};

/// Credentials needed to resume a WhatsApp Web login.
///
/// Field names on the wire match what the automation client emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    #[serde(rename = "WABrowserId", default)]
    pub browser_id: String,
    #[serde(rename = "WASecretBundle", default)]
    pub secret_bundle: String,
    #[serde(rename = "WAToken1", default)]
    pub token1: String,
    #[serde(rename = "WAToken2", default)]
    pub token2: String,
}

impl SessionCredentials {
    /// Placeholder values used to pre-seed an empty session table.
    pub fn placeholder() -> Self {
        Self {
            browser_id: "abc".to_string(),
            secret_bundle: "xyz".to_string(),
            token1: "123".to_string(),
            token2: "456".to_string(),
        }
    }

    /// Reject credentials with any empty field.
    pub fn validate(&self) -> Result<(), AtendeError> {
        let fields = [
            ("WABrowserId", &self.browser_id),
            ("WASecretBundle", &self.secret_bundle),
            ("WAToken1", &self.token1),
            ("WAToken2", &self.token2),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AtendeError::InvalidSession(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }

    /// Parse and validate a JSON value emitted by the client.
    pub fn from_value(value: serde_json::Value) -> Result<Self, AtendeError> {
        if !value.is_object() {
            return Err(AtendeError::InvalidSession(
                "session is not a JSON object".into(),
            ));
        }
        let creds: Self = serde_json::from_value(value)
            .map_err(|e| AtendeError::InvalidSession(format!("malformed session: {e}")))?;
        creds.validate()?;
        Ok(creds)
    }

    /// Serialize to the blob stored in the session table.
    pub fn to_blob(&self) -> Result<String, AtendeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a stored blob. Invalid blobs are errors, never half-filled values.
    pub fn from_blob(blob: &str) -> Result<Self, AtendeError> {
        if blob.trim().is_empty() {
            return Err(AtendeError::InvalidSession("empty session blob".into()));
        }
        let value: serde_json::Value = serde_json::from_str(blob)?;
        Self::from_value(value)
    }
}
