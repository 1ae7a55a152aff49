//! Reminder store: pending reminders and per-chat topic mappings.
//!
//! All state lives in memory behind a single `RwLock`. Every mutation
//! rewrites the JSON snapshot before releasing the write guard, so the file
//! always reflects the last completed mutation and never a torn one.

mod snapshot;


use nudge_core::{
    error::NudgeError,
    reminder::{Reminder, ReminderKey},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use snapshot::State;

/// Authoritative collection of pending reminders, persisted on every write.
#[derive(Clone)]
pub struct ReminderStore {
    inner: Arc<RwLock<State>>,
    path: PathBuf,
}

impl ReminderStore {
    /// Open the store, loading the snapshot at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or malformed
    /// file is `NudgeError::CorruptState`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, NudgeError> {
        let path = path.into();
        let state = snapshot::read(&path).await?;

        info!(
            "Reminder store loaded from {} ({} reminders, {} topics)",
            path.display(),
            state.reminders.len(),
            state.topics.len()
        );

        Ok(Self {
            inner: Arc::new(RwLock::new(state)),
            path,
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite the reminder at `key`.
    ///
    /// On `NudgeError::Persistence` the reminder is still held in memory.
    pub async fn add(&self, key: ReminderKey, reminder: Reminder) -> Result<(), NudgeError> {
        let mut state = self.inner.write().await;
        state.reminders.insert(key, reminder);
        debug!("reminder {key} stored");
        snapshot::write(&self.path, &state).await
    }

    /// Look up one reminder.
    pub async fn get(&self, key: &ReminderKey) -> Option<Reminder> {
        self.inner.read().await.reminders.get(key).cloned()
    }

    /// Remove the reminder at `key`. Removing a missing key is a no-op.
    pub async fn delete(&self, key: &ReminderKey) -> Result<(), NudgeError> {
        let mut state = self.inner.write().await;
        if state.reminders.remove(key).is_none() {
            return Ok(());
        }
        debug!("reminder {key} removed");
        snapshot::write(&self.path, &state).await
    }

    /// Copy of all reminders, earliest first.
    ///
    /// Callers iterate the copy without holding the lock.
    pub async fn snapshot(&self) -> Vec<(ReminderKey, Reminder)> {
        let state = self.inner.read().await;
        let mut all: Vec<_> = state
            .reminders
            .iter()
            .map(|(k, r)| (*k, r.clone()))
            .collect();
        drop(state);
        all.sort_by(|(ka, a), (kb, b)| a.fire_at.cmp(&b.fire_at).then(ka.cmp(kb)));
        all
    }

    /// Pending reminders for one chat, earliest first.
    pub async fn for_chat(&self, chat_id: i64) -> Vec<Reminder> {
        let state = self.inner.read().await;
        let mut found: Vec<Reminder> = state
            .reminders
            .values()
            .filter(|r| r.chat_id == chat_id)
            .cloned()
            .collect();
        drop(state);
        found.sort_by_key(|r| r.fire_at);
        found
    }

    /// Number of pending reminders.
    pub async fn len(&self) -> usize {
        self.inner.read().await.reminders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cached notification topic for `chat_id`.
    pub async fn topic(&self, chat_id: i64) -> Option<i64> {
        self.inner.read().await.topics.get(&chat_id).copied()
    }

    /// Remember the notification topic for `chat_id`.
    pub async fn set_topic(&self, chat_id: i64, topic_id: i64) -> Result<(), NudgeError> {
        let mut state = self.inner.write().await;
        state.topics.insert(chat_id, topic_id);
        debug!("topic {topic_id} cached for chat {chat_id}");
        snapshot::write(&self.path, &state).await
    }
}
