//! Forum topic lookup/creation and `DeliveryGateway` implementation.

use super::types::{ChatRequest, CreateTopicRequest, TgForumTopic, TgResponse};
use super::TelegramChannel;
use async_trait::async_trait;
use nudge_core::{error::NudgeError, traits::DeliveryGateway};
use tracing::{debug, info};

/// First topic named exactly `name`.
pub(crate) fn pick_topic(topics: &[TgForumTopic], name: &str) -> Option<i64> {
    topics
        .iter()
        .find(|t| t.name == name)
        .map(|t| t.message_thread_id)
}

impl TelegramChannel {
    /// Existing topics in a forum chat.
    async fn list_topics(&self, chat_id: i64) -> Result<Vec<TgForumTopic>, NudgeError> {
        let url = format!("{}/getForumTopicsByChat", self.base_url);
        let resp: TgResponse<Vec<TgForumTopic>> = self
            .client
            .post(&url)
            .json(&ChatRequest { chat_id })
            .send()
            .await
            .map_err(|e| NudgeError::Channel(format!("telegram topic lookup failed: {e}")))?
            .json()
            .await
            .map_err(|e| {
                NudgeError::Channel(format!("telegram topic lookup parse failed: {e}"))
            })?;

        if !resp.ok {
            return Err(NudgeError::Channel(format!(
                "telegram topic lookup rejected: {}",
                resp.description.unwrap_or_default()
            )));
        }
        Ok(resp.result.unwrap_or_default())
    }

    async fn create_topic(&self, chat_id: i64) -> Result<i64, NudgeError> {
        let url = format!("{}/createForumTopic", self.base_url);
        let resp: TgResponse<TgForumTopic> = self
            .client
            .post(&url)
            .json(&CreateTopicRequest {
                chat_id,
                name: &self.topic_name,
            })
            .send()
            .await
            .map_err(|e| NudgeError::Channel(format!("telegram createForumTopic failed: {e}")))?
            .json()
            .await
            .map_err(|e| {
                NudgeError::Channel(format!("telegram createForumTopic parse failed: {e}"))
            })?;

        match resp.result {
            Some(topic) if resp.ok => Ok(topic.message_thread_id),
            _ => Err(NudgeError::Channel(format!(
                "telegram createForumTopic rejected: {}",
                resp.description.unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl DeliveryGateway for TelegramChannel {
    async fn resolve_or_create_topic(&self, chat_id: i64) -> Result<i64, NudgeError> {
        match self.list_topics(chat_id).await {
            Ok(topics) => {
                if let Some(id) = pick_topic(&topics, &self.topic_name) {
                    debug!("found existing topic {id} in chat {chat_id}");
                    return Ok(id);
                }
            }
            // Lookup is best-effort; creating the topic is the fallback.
            Err(e) => debug!("topic lookup in chat {chat_id} failed: {e}"),
        }

        let id = self.create_topic(chat_id).await?;
        info!("created topic '{}' ({id}) in chat {chat_id}", self.topic_name);
        Ok(id)
    }

    async fn send_to_topic(
        &self,
        chat_id: i64,
        topic_id: i64,
        text: &str,
    ) -> Result<(), NudgeError> {
        self.send_text(chat_id, Some(topic_id), text)
            .await
            .map_err(|e| NudgeError::Delivery(e.to_string()))
    }
}
