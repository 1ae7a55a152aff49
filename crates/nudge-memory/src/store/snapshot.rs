//! On-disk snapshot format and atomic file replacement.
//!
//! ```json
//! {
//!   "reminder_topics": { "<chat_id>": <topic_id> },
//!   "reminders": {
//!     "<chat_id>_<message_id>": {
//!       "action": "...", "date_time": "<RFC3339>",
//!       "chat_id": 1, "message_id": 2, "thread_id": 0
//!     }
//!   }
//! }
//! ```

use chrono::{DateTime, SecondsFormat};
use nudge_core::{
    error::NudgeError,
    reminder::{Reminder, ReminderKey},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// One reminder as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ReminderRecord {
    pub action: String,
    /// RFC3339 with the zone offset the user meant.
    pub date_time: String,
    pub chat_id: i64,
    pub message_id: i64,
    /// `0` when the reminder was not created inside a topic.
    #[serde(default)]
    pub thread_id: i64,
}

impl From<&Reminder> for ReminderRecord {
    fn from(r: &Reminder) -> Self {
        Self {
            action: r.action.clone(),
            date_time: r.fire_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            chat_id: r.chat_id,
            message_id: r.message_id,
            thread_id: r.thread_id.unwrap_or(0),
        }
    }
}

impl TryFrom<ReminderRecord> for Reminder {
    type Error = NudgeError;

    fn try_from(rec: ReminderRecord) -> Result<Self, Self::Error> {
        let fire_at = DateTime::parse_from_rfc3339(&rec.date_time).map_err(|e| {
            NudgeError::CorruptState(format!("bad date_time '{}': {e}", rec.date_time))
        })?;
        Ok(Self {
            action: rec.action,
            fire_at,
            chat_id: rec.chat_id,
            message_id: rec.message_id,
            thread_id: (rec.thread_id != 0).then_some(rec.thread_id),
        })
    }
}

/// The whole durable state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct PersistedState {
    #[serde(default)]
    pub reminder_topics: BTreeMap<i64, i64>,
    #[serde(default)]
    pub reminders: BTreeMap<String, ReminderRecord>,
}

/// In-memory form of the state, keyed by typed reminder keys.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub topics: BTreeMap<i64, i64>,
    pub reminders: BTreeMap<ReminderKey, Reminder>,
}

impl State {
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            reminder_topics: self.topics.clone(),
            reminders: self
                .reminders
                .iter()
                .map(|(key, r)| (key.to_string(), ReminderRecord::from(r)))
                .collect(),
        }
    }

    pub fn from_persisted(persisted: PersistedState) -> Result<Self, NudgeError> {
        let mut reminders = BTreeMap::new();
        for (raw_key, record) in persisted.reminders {
            let key: ReminderKey = raw_key
                .parse()
                .map_err(|e| NudgeError::CorruptState(format!("{e}")))?;
            reminders.insert(key, Reminder::try_from(record)?);
        }
        Ok(Self {
            topics: persisted.reminder_topics,
            reminders,
        })
    }
}

/// Read the snapshot at `path`. A missing file is an empty state.
pub(crate) async fn read(path: &Path) -> Result<State, NudgeError> {
    let bytes = match fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(State::default()),
        Err(e) => {
            return Err(NudgeError::CorruptState(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };

    let persisted: PersistedState = serde_json::from_slice(&bytes).map_err(|e| {
        NudgeError::CorruptState(format!("failed to parse {}: {e}", path.display()))
    })?;

    State::from_persisted(persisted)
}

/// Replace the snapshot at `path`: write a sibling temp file, then rename.
pub(crate) async fn write(path: &Path, state: &State) -> Result<(), NudgeError> {
    let json = serde_json::to_vec_pretty(&state.to_persisted())
        .map_err(|e| NudgeError::Persistence(format!("failed to serialize state: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|e| {
            NudgeError::Persistence(format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let temp = temp_path(path);
    fs::write(&temp, &json)
        .await
        .map_err(|e| NudgeError::Persistence(format!("failed to write {}: {e}", temp.display())))?;
    fs::rename(&temp, path).await.map_err(|e| {
        NudgeError::Persistence(format!("failed to replace {}: {e}", path.display()))
    })?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
