use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incoming text message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Channel name (e.g. "telegram").
    pub channel: String,
    pub chat_id: i64,
    /// Platform message ID, unique within `chat_id`.
    pub message_id: i64,
    /// Forum topic the message was posted in, if any.
    #[serde(default)]
    pub thread_id: Option<i64>,
    /// Platform-specific user ID.
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl IncomingMessage {
    /// Bot command name without the leading slash or `@botname` suffix.
    ///
    /// `"/help@nudge_bot extra"` yields `Some("help")`.
    pub fn command(&self) -> Option<&str> {
        let first = self.text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub chat_id: i64,
    /// Topic to post into. `None` posts to the chat's main thread.
    #[serde(default)]
    pub thread_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> IncomingMessage {
        IncomingMessage {
            channel: "telegram".to_string(),
            chat_id: 1,
            message_id: 1,
            thread_id: None,
            sender_id: "42".to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_command_plain() {
        assert_eq!(msg("/start").command(), Some("start"));
    }

    #[test]
    fn test_command_with_bot_suffix_and_args() {
        assert_eq!(msg("/help@nudge_bot please").command(), Some("help"));
    }

    #[test]
    fn test_command_absent() {
        assert_eq!(msg("Позвонить маме в 10").command(), None);
        assert_eq!(msg("/").command(), None);
        assert_eq!(msg("").command(), None);
    }
}
