//! Message processing pipeline: commands, then split, parse, store, confirm.

use super::commands::{self, Command, HELP_TEXT, START_TEXT};
use super::Gateway;
use chrono::{DateTime, Utc};
use nudge_core::{
    error::NudgeError,
    message::{IncomingMessage, OutgoingMessage},
    reminder::Reminder,
};
use nudge_parse::{split, DateTimeParser};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Turn an inbound message into a reminder, resolving times against `now`.
pub fn build_reminder(
    parser: &DateTimeParser,
    incoming: &IncomingMessage,
    now: DateTime<Utc>,
) -> Result<Reminder, NudgeError> {
    let parts = split(&incoming.text)?;
    let fire_at = parser.parse(&parts.fragment, now)?;
    Ok(Reminder {
        action: parts.action,
        fire_at,
        chat_id: incoming.chat_id,
        message_id: incoming.message_id,
        thread_id: incoming.thread_id,
    })
}

/// Confirmation sent after a reminder is stored.
pub fn confirmation_text(reminder: &Reminder) -> String {
    format!(
        "✅ Запланировано: {}\nДата и время: {}",
        reminder.action,
        reminder.fire_at.format("%H:%M %d.%m.%Y")
    )
}

impl Gateway {
    /// Process a single incoming message.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) {
        if let Some(name) = incoming.command() {
            match Command::parse(name) {
                Some(Command::Start) => self.reply(&incoming, START_TEXT).await,
                Some(Command::Help) => self.reply(&incoming, HELP_TEXT).await,
                Some(Command::List) => {
                    let text = commands::list_text(&self.store, incoming.chat_id).await;
                    self.reply(&incoming, &text).await;
                }
                None => debug!("ignoring unknown command /{name}"),
            }
            return;
        }

        let reminder = match build_reminder(&self.parser, &incoming, incoming.timestamp) {
            Ok(r) => r,
            Err(e) => {
                debug!(
                    "ignoring message {} in chat {}: {e}",
                    incoming.message_id, incoming.chat_id
                );
                return;
            }
        };

        let key = reminder.key();
        info!(
            "[{}] reminder {key} scheduled for {}: {}",
            incoming.channel, reminder.fire_at, reminder.action
        );
        let confirmation = confirmation_text(&reminder);
        if let Err(e) = self.store.add(key, reminder).await {
            warn!("reminder {key} kept in memory only: {e}");
        }

        self.reply(&incoming, &confirmation).await;
    }

    /// Answer into the reminder topic, falling back to the originating thread.
    async fn reply(&self, incoming: &IncomingMessage, text: &str) {
        let routed = match timeout(
            self.reply_timeout,
            self.router.deliver(incoming.chat_id, text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(NudgeError::Delivery("topic reply timed out".into())),
        };

        let Err(e) = routed else {
            return;
        };
        debug!(
            "topic reply to chat {} failed, replying in place: {e}",
            incoming.chat_id
        );

        let msg = OutgoingMessage {
            text: text.to_string(),
            chat_id: incoming.chat_id,
            thread_id: incoming.thread_id,
        };
        if let Err(e) = self.channel.send(msg).await {
            warn!("failed to reply in chat {}: {e}", incoming.chat_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::delivery::fake::FakeGateway;
    use super::super::Gateway;
    use super::*;
    use async_trait::async_trait;
    use chrono::{FixedOffset, TimeZone};
    use nudge_core::{config::SchedulerConfig, reminder::ReminderKey, traits::Channel};
    use nudge_memory::ReminderStore;
    use nudge_parse::Zone;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeChannel {
        sent: Mutex<Vec<OutgoingMessage>>,
    }

    #[async_trait]
    impl Channel for FakeChannel {
        fn name(&self) -> &str {
            "fake"
        }

        async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, NudgeError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn send(&self, message: OutgoingMessage) -> Result<(), NudgeError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn stop(&self) -> Result<(), NudgeError> {
            Ok(())
        }
    }

    fn incoming(text: &str) -> IncomingMessage {
        IncomingMessage {
            channel: "fake".into(),
            chat_id: -100,
            message_id: 42,
            thread_id: Some(3),
            sender_id: "7".into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    fn moscow() -> DateTimeParser {
        DateTimeParser::new(Zone::resolve("Europe/Moscow"))
    }

    struct Harness {
        _dir: TempDir,
        store: ReminderStore,
        fake: Arc<FakeGateway>,
        channel: Arc<FakeChannel>,
        gateway: Gateway,
    }

    async fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let store = ReminderStore::open(dir.path().join("state.json"))
            .await
            .unwrap();
        let fake = Arc::new(FakeGateway::default());
        let channel = Arc::new(FakeChannel::default());
        let gateway = Gateway::new(
            channel.clone(),
            fake.clone(),
            store.clone(),
            moscow(),
            std::time::Duration::from_secs(600),
            SchedulerConfig::default(),
        )
        .unwrap();
        Harness {
            _dir: dir,
            store,
            fake,
            channel,
            gateway,
        }
    }

    #[test]
    fn test_build_reminder_two_lines() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let r = build_reminder(&moscow(), &incoming("Позвонить маме\n13.03.2025 в 21:04"), now)
            .unwrap();
        let msk = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(r.action, "Позвонить маме");
        assert_eq!(r.fire_at, msk.with_ymd_and_hms(2025, 3, 13, 21, 4, 0).unwrap());
        assert_eq!(r.key(), ReminderKey::new(-100, 42));
        assert_eq!(r.thread_id, Some(3));
    }

    #[test]
    fn test_build_reminder_rejects_plain_text() {
        let now = Utc::now();
        let err = build_reminder(&moscow(), &incoming("просто привет"), now).unwrap_err();
        assert!(matches!(err, NudgeError::Parse(_)));
    }

    #[test]
    fn test_confirmation_text() {
        let msk = FixedOffset::east_opt(3 * 3600).unwrap();
        let r = Reminder {
            action: "Позвонить маме".into(),
            fire_at: msk.with_ymd_and_hms(2025, 3, 13, 21, 4, 0).unwrap(),
            chat_id: 1,
            message_id: 1,
            thread_id: None,
        };
        assert_eq!(
            confirmation_text(&r),
            "✅ Запланировано: Позвонить маме\nДата и время: 21:04 13.03.2025"
        );
    }

    #[tokio::test]
    async fn test_message_stored_and_confirmed_in_topic() {
        let h = harness().await;
        h.gateway
            .handle_message(incoming("Купить хлеб\n01.01.2099 в 10:00"))
            .await;

        let stored = h.store.get(&ReminderKey::new(-100, 42)).await.unwrap();
        assert_eq!(stored.action, "Купить хлеб");

        let sent = h.fake.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, -100);
        assert_eq!(sent[0].1, -1000);
        assert!(sent[0].2.starts_with("✅ Запланировано: Купить хлеб"));
        assert!(h.channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirmation_falls_back_to_plain_reply() {
        let h = harness().await;
        h.fake.fail_chat(-100, true);
        h.gateway
            .handle_message(incoming("Купить хлеб\n01.01.2099 в 10:00"))
            .await;

        assert_eq!(h.store.len().await, 1);
        let plain = h.channel.sent.lock().unwrap().clone();
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].chat_id, -100);
        assert_eq!(plain[0].thread_id, Some(3));
    }

    #[tokio::test]
    async fn test_times_resolve_against_message_timestamp() {
        let h = harness().await;
        let mut msg = incoming("Встреча в 10:00");
        msg.timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 5, 0, 0).unwrap();
        h.gateway.handle_message(msg).await;

        let stored = h.store.get(&ReminderKey::new(-100, 42)).await.unwrap();
        let msk = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(stored.action, "Встреча");
        assert_eq!(stored.fire_at, msk.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_unparseable_message_ignored() {
        let h = harness().await;
        h.gateway.handle_message(incoming("просто привет")).await;
        assert!(h.store.is_empty().await);
        assert!(h.fake.sent().is_empty());
        assert!(h.channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commands() {
        let h = harness().await;
        h.gateway.handle_message(incoming("/help@nudge_bot")).await;
        h.gateway.handle_message(incoming("/list")).await;
        h.gateway.handle_message(incoming("/unknown")).await;

        let sent = h.fake.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].2, HELP_TEXT);
        assert_eq!(sent[1].2, "Нет запланированных напоминаний.");
        assert!(h.store.is_empty().await);
    }
}
