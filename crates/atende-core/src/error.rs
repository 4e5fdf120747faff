use thiserror::Error;

/// Top-level error type for atende.
#[derive(Debug, Error)]
pub enum AtendeError {
    /// Error from the session store backend (database or REST API).
    #[error("store error: {0}")]
    Store(String),

    /// Session credentials failed validation and were not written.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// Error from the QR notification (e-mail) path.
    #[error("notify error: {0}")]
    Notify(String),

    /// Error from the WhatsApp automation client.
    #[error("client error: {0}")]
    Client(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
