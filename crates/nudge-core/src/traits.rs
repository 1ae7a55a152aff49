use crate::{
    error::NudgeError,
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Messaging channel trait: where reminders come from.
///
/// A platform (Telegram, ...) implements this trait to receive user
/// messages and reply to them.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, NudgeError>;

    /// Send a message back through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), NudgeError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), NudgeError>;
}

/// Delivery gateway trait: where notifications go.
///
/// Notifications are grouped in a dedicated topic per chat. Callers cache
/// the resolved topic id, so implementations only need to be idempotent.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    /// Find the reminder topic in `chat_id`, creating it if none exists.
    ///
    /// An existing topic with the reserved name must be preferred over
    /// creating a duplicate.
    async fn resolve_or_create_topic(&self, chat_id: i64) -> Result<i64, NudgeError>;

    /// Post `text` into topic `topic_id` of `chat_id`.
    async fn send_to_topic(&self, chat_id: i64, topic_id: i64, text: &str)
        -> Result<(), NudgeError>;
}
