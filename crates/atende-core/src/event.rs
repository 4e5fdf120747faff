use crate::message::IncomingMessage;

/// Lifecycle and message events emitted by a WhatsApp client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A new login code is ready to be scanned.
    CodeReady(String),
    /// Pairing succeeded. Carries the raw credential object when the client exposes one.
    Authenticated(Option<serde_json::Value>),
    /// The client rejected the supplied credentials.
    AuthFailure(String),
    /// The client is connected and can send messages.
    Ready,
    /// The client lost its session.
    Disconnected(String),
    /// An inbound chat message.
    Message(IncomingMessage),
    /// A client-side error that does not change the lifecycle.
    Error(String),
}

impl ClientEvent {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CodeReady(_) => "code_ready",
            Self::Authenticated(_) => "authenticated",
            Self::AuthFailure(_) => "auth_failure",
            Self::Ready => "ready",
            Self::Disconnected(_) => "disconnected",
            Self::Message(_) => "message",
            Self::Error(_) => "error",
        }
    }
}
