use crate::{error::AtendeError, event::ClientEvent, session::SessionCredentials};
use async_trait::async_trait;

/// WhatsApp client trait: the transport.
///
/// Implementations drive a WhatsApp Web session and report lifecycle and
/// message events through the returned receiver.
#[async_trait]
pub trait WhatsAppClient: Send + Sync {
    /// Human-readable client name.
    fn name(&self) -> &str;

    /// Start the client, resuming `session` when given.
    /// Returns a receiver that yields client events until the client stops.
    async fn initialize(
        &self,
        session: Option<SessionCredentials>,
    ) -> Result<tokio::sync::mpsc::Receiver<ClientEvent>, AtendeError>;

    /// Send a text message to a chat.
    async fn send_message(&self, to: &str, text: &str) -> Result<(), AtendeError>;

    /// Show the "typing…" presence in a chat.
    async fn send_typing(&self, _chat: &str) -> Result<(), AtendeError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), AtendeError>;
}

/// Raw point operations on the session table, keyed by a fixed id.
///
/// Errors are returned as-is; the fail-soft policy lives one level up.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Backend name for logs (e.g. "supabase").
    fn name(&self) -> &str;

    /// Select the stored blob for `key`. `Ok(None)` when no row exists.
    async fn fetch(&self, key: &str) -> Result<Option<String>, AtendeError>;

    /// Insert or overwrite the blob for `key`.
    async fn upsert(&self, key: &str, blob: &str) -> Result<(), AtendeError>;

    /// Delete the row for `key`. Missing rows are not an error.
    async fn delete(&self, key: &str) -> Result<(), AtendeError>;

    /// Whether the table holds any row at all.
    async fn has_rows(&self) -> Result<bool, AtendeError>;
}

/// Delivers a freshly generated login QR to an administrator.
#[async_trait]
pub trait QrNotifier: Send + Sync {
    /// Human-readable notifier name.
    fn name(&self) -> &str;

    /// Send the QR image (PNG bytes).
    async fn notify(&self, png: &[u8]) -> Result<(), AtendeError>;
}
