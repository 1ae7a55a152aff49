//! Reminder domain types.

use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::str::FromStr;

use crate::error::NudgeError;

/// Identity of a reminder: the chat and the message that created it.
///
/// Rendered as `"{chat_id}_{message_id}"`, the key format used in state files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReminderKey {
    pub chat_id: i64,
    pub message_id: i64,
}

impl ReminderKey {
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.chat_id, self.message_id)
    }
}

impl FromStr for ReminderKey {
    type Err = NudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Group chat ids are negative, so split on the last underscore.
        let (chat, message) = s
            .rsplit_once('_')
            .ok_or_else(|| NudgeError::Parse(format!("invalid reminder key '{s}'")))?;
        let chat_id = chat
            .parse()
            .map_err(|e| NudgeError::Parse(format!("invalid chat id in key '{s}': {e}")))?;
        let message_id = message
            .parse()
            .map_err(|e| NudgeError::Parse(format!("invalid message id in key '{s}': {e}")))?;
        Ok(Self::new(chat_id, message_id))
    }
}

/// A scheduled notification. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub action: String,
    pub fire_at: DateTime<FixedOffset>,
    pub chat_id: i64,
    pub message_id: i64,
    pub thread_id: Option<i64>,
}

impl Reminder {
    pub fn key(&self) -> ReminderKey {
        ReminderKey::new(self.chat_id, self.message_id)
    }
}
