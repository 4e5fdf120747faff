//! JSON-lines wire format between atende and the bridge process.
//!
//! Every line on the bridge's stdout is one object tagged by `type`.
//! Commands go the other way on stdin, one object per line.

use atende_core::{
    error::AtendeError, event::ClientEvent, message::IncomingMessage,
    session::SessionCredentials,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event emitted by the bridge.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    Qr {
        data: String,
    },
    Authenticated {
        #[serde(default)]
        session: Option<Value>,
    },
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    Ready,
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    Message {
        from: String,
        #[serde(default)]
        body: String,
        #[serde(default)]
        chat: Option<String>,
        #[serde(default)]
        push_name: Option<String>,
        #[serde(default)]
        is_group: Option<bool>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl From<BridgeEvent> for ClientEvent {
    fn from(event: BridgeEvent) -> Self {
        match event {
            BridgeEvent::Qr { data } => ClientEvent::CodeReady(data),
            BridgeEvent::Authenticated { session } => ClientEvent::Authenticated(session),
            BridgeEvent::AuthFailure { message } => ClientEvent::AuthFailure(message),
            BridgeEvent::Ready => ClientEvent::Ready,
            BridgeEvent::Disconnected { reason } => ClientEvent::Disconnected(reason),
            BridgeEvent::Message {
                from,
                body,
                chat,
                push_name,
                is_group,
            } => {
                let mut msg = IncomingMessage::new(&from, &body);
                if let Some(chat) = chat.filter(|c| !c.is_empty()) {
                    msg.chat_id = chat;
                }
                if let Some(name) = push_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
                {
                    msg = msg.with_sender_name(name);
                }
                if let Some(is_group) = is_group {
                    msg.is_group = is_group;
                }
                ClientEvent::Message(msg)
            }
            BridgeEvent::Error { message } => ClientEvent::Error(message),
        }
    }
}

/// Result of decoding one stdout line.
#[derive(Debug)]
pub enum Decoded {
    Event(ClientEvent),
    /// Non-JSON output, such as the bridge's own logging.
    Output(String),
    /// JSON that is not a known event.
    Unrecognized(String),
}

/// Decode one line of bridge output. Blank lines yield `None`.
pub fn decode_line(line: &str) -> Option<Decoded> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return Some(Decoded::Output(trimmed.to_string())),
    };
    Some(match serde_json::from_value::<BridgeEvent>(value) {
        Ok(event) => Decoded::Event(event.into()),
        Err(e) => Decoded::Unrecognized(format!("{e}: {trimmed}")),
    })
}

/// Command sent to the bridge.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeCommand<'a> {
    Initialize {
        session: Option<&'a SessionCredentials>,
    },
    Send {
        to: &'a str,
        text: &'a str,
    },
    Typing {
        chat: &'a str,
    },
    Shutdown,
}

impl BridgeCommand<'_> {
    /// Newline-terminated JSON line.
    pub fn to_line(&self) -> Result<String, AtendeError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
