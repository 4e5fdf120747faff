use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender-id suffix used by one-to-one WhatsApp chats.
pub const INDIVIDUAL_CHAT_SUFFIX: &str = "@c.us";

/// An incoming chat message, as reported by the WhatsApp client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Platform-specific sender id (e.g. `5511999999999@c.us`).
    pub sender_id: String,
    /// Contact push name, when the client exposes one.
    pub sender_name: Option<String>,
    /// Message body text.
    pub text: String,
    /// Chat the message arrived in. Replies go here.
    pub chat_id: String,
    pub timestamp: DateTime<Utc>,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
}

impl IncomingMessage {
    /// Build a message with a fresh id and the current timestamp.
    pub fn new(sender_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            sender_name: None,
            text: text.to_string(),
            chat_id: sender_id.to_string(),
            timestamp: Utc::now(),
            is_group: !sender_id.ends_with(INDIVIDUAL_CHAT_SUFFIX),
        }
    }

    /// Attach the contact's display name.
    pub fn with_sender_name(mut self, name: &str) -> Self {
        self.sender_name = Some(name.to_string());
        self
    }

    /// True when the sender is a one-to-one chat (not a group or broadcast).
    /// A client-reported group flag wins over the sender suffix.
    pub fn is_individual(&self) -> bool {
        !self.is_group && self.sender_id.ends_with(INDIVIDUAL_CHAT_SUFFIX)
    }

    /// First word of the sender's display name, if any.
    pub fn first_name(&self) -> Option<&str> {
        self.sender_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_individual_suffix() {
        assert!(IncomingMessage::new("5511999999999@c.us", "oi").is_individual());
        assert!(!IncomingMessage::new("120363001234567890@g.us", "oi").is_individual());
        assert!(!IncomingMessage::new("status@broadcast", "oi").is_individual());
    }

    #[test]
    fn test_group_flag_overrides_suffix() {
        let mut msg = IncomingMessage::new("5511999999999@c.us", "oi");
        msg.is_group = true;
        assert!(!msg.is_individual());
    }

    #[test]
    fn test_first_name() {
        let msg = IncomingMessage::new("5511999999999@c.us", "oi").with_sender_name("Maria  Silva");
        assert_eq!(msg.first_name(), Some("Maria"));

        let anon = IncomingMessage::new("5511999999999@c.us", "oi");
        assert_eq!(anon.first_name(), None);

        let blank = IncomingMessage::new("5511999999999@c.us", "oi").with_sender_name("   ");
        assert_eq!(blank.first_name(), None);
    }
}
