//! Topic routing: every bot message goes to the chat's reminder topic.

use nudge_core::{error::NudgeError, traits::DeliveryGateway};
use nudge_memory::ReminderStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Sends text into a chat's reminder topic, resolving and caching the
/// topic id on first use.
#[derive(Clone)]
pub struct TopicRouter {
    store: ReminderStore,
    gateway: Arc<dyn DeliveryGateway>,
    /// Serializes cache misses so concurrent senders never create two topics.
    resolving: Arc<Mutex<()>>,
}

impl TopicRouter {
    pub fn new(store: ReminderStore, gateway: Arc<dyn DeliveryGateway>) -> Self {
        Self {
            store,
            gateway,
            resolving: Arc::new(Mutex::new(())),
        }
    }

    /// Topic id for `chat_id`, from cache or from the platform.
    pub async fn topic_for(&self, chat_id: i64) -> Result<i64, NudgeError> {
        if let Some(id) = self.store.topic(chat_id).await {
            return Ok(id);
        }

        let _guard = self.resolving.lock().await;
        if let Some(id) = self.store.topic(chat_id).await {
            return Ok(id);
        }

        let id = self.gateway.resolve_or_create_topic(chat_id).await?;
        if let Err(e) = self.store.set_topic(chat_id, id).await {
            warn!("failed to save topic {id} for chat {chat_id}: {e}");
        }
        info!("reminder topic for chat {chat_id} is {id}");
        Ok(id)
    }

    /// Post `text` into the reminder topic of `chat_id`.
    pub async fn deliver(&self, chat_id: i64, text: &str) -> Result<(), NudgeError> {
        let topic_id = self.topic_for(chat_id).await?;
        self.gateway.send_to_topic(chat_id, topic_id, text).await
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeGateway;
    use super::*;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_topic_resolved_once_and_cached() {
        let dir = TempDir::new().unwrap();
        let store = ReminderStore::open(dir.path().join("state.json"))
            .await
            .unwrap();
        let fake = Arc::new(FakeGateway::default());
        let router = TopicRouter::new(store.clone(), fake.clone());

        router.deliver(5, "one").await.unwrap();
        router.deliver(5, "two").await.unwrap();

        assert_eq!(fake.topic_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(store.topic(5).await, Some(50));
        assert_eq!(
            fake.sent(),
            vec![(5, 50, "one".to_string()), (5, 50, "two".to_string())]
        );

        // Cached across restarts.
        let reopened = ReminderStore::open(store.path()).await.unwrap();
        assert_eq!(reopened.topic(5).await, Some(50));
    }

    #[tokio::test]
    async fn test_send_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let store = ReminderStore::open(dir.path().join("state.json"))
            .await
            .unwrap();
        let fake = Arc::new(FakeGateway::default());
        fake.fail_chat(5, true);
        let router = TopicRouter::new(store, fake.clone());

        let err = router.deliver(5, "x").await.unwrap_err();
        assert!(matches!(err, NudgeError::Delivery(_)));
        assert!(fake.sent().is_empty());
    }
}
