//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` for inbound messages, `sendMessage`
//! for replies, and forum topics for grouping notifications.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod send;
mod topics;
pub(crate) mod types;


use nudge_core::config::TelegramConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
    /// Name of the forum topic notifications are posted to.
    topic_name: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig, topic_name: impl Into<String>) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                warn!("failed to build telegram http client, using defaults: {e}");
                reqwest::Client::new()
            });
        Self {
            config,
            client,
            base_url,
            topic_name: topic_name.into(),
            last_update_id: Arc::new(Mutex::new(None)),
        }
    }
}
