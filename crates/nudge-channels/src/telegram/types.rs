//! Telegram Bot API (de)serialization types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgMessage {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: TgChat,
    /// Send time, Unix seconds.
    #[serde(default)]
    pub date: i64,
    pub text: Option<String>,
    /// Forum topic id, present when the message was posted in a topic.
    pub message_thread_id: Option<i64>,
    #[serde(default)]
    pub is_topic_message: bool,
}

impl TgMessage {
    /// Topic the message belongs to. Plain replies in non-forum groups also
    /// carry `message_thread_id`, so only trust it for topic messages.
    pub fn topic_id(&self) -> Option<i64> {
        if self.is_topic_message {
            self.message_thread_id
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUser {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgChat {
    pub id: i64,
    /// Chat type: "private", "group", "supergroup", or "channel".
    #[serde(default, rename = "type")]
    pub chat_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TgForumTopic {
    pub message_thread_id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateTopicRequest<'a> {
    pub chat_id: i64,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub chat_id: i64,
}
