//! Message sending and command registration.

use super::types::{SendMessageRequest, TgResponse};
use super::TelegramChannel;
use nudge_core::error::NudgeError;
use tracing::{info, warn};

impl TelegramChannel {
    /// Send a plain text message, optionally into a forum topic.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        text: &str,
    ) -> Result<(), NudgeError> {
        let url = format!("{}/sendMessage", self.base_url);
        let body = SendMessageRequest {
            chat_id,
            text,
            message_thread_id: thread_id,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NudgeError::Channel(format!("telegram send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(NudgeError::Channel(format!(
                "telegram send failed ({status}): {error_text}"
            )));
        }

        let parsed: TgResponse<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| NudgeError::Channel(format!("telegram send parse failed: {e}")))?;
        if !parsed.ok {
            return Err(NudgeError::Channel(format!(
                "telegram send rejected: {}",
                parsed.description.unwrap_or_default()
            )));
        }

        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = serde_json::json!({
            "commands": [
                { "command": "start", "description": "Как пользоваться ботом" },
                { "command": "help", "description": "Поддерживаемые форматы даты" },
                { "command": "list", "description": "Запланированные напоминания" },
            ]
        });

        let url = format!("{}/setMyCommands", self.base_url);
        match self.client.post(&url).json(&commands).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}
