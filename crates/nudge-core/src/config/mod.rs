mod defaults;


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::NudgeError;
use defaults::*;

/// Top-level Nudge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// State snapshot file. Relative paths resolve against `data_dir`.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            state_file: default_state_file(),
        }
    }
}

/// Reminder semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// How long before the event the notification fires.
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: u64,
    /// IANA zone name used to interpret user-supplied times.
    /// Unknown names fall back to the host's local zone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Name of the per-chat topic that notifications are posted to.
    #[serde(default = "default_topic_name")]
    pub topic_name: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            lead_minutes: default_lead_minutes(),
            timezone: default_timezone(),
            topic_name: default_topic_name(),
        }
    }
}

impl ReminderConfig {
    pub fn lead_time(&self) -> Duration {
        Duration::from_secs(self.lead_minutes * 60)
    }
}

/// Scheduler configuration. The tick period itself is fixed at one minute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Upper bound on a single delivery attempt, topic lookup included.
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delivery_timeout_secs: default_delivery_timeout(),
        }
    }
}

impl SchedulerConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Telegram user ids allowed to create reminders. Empty = allow all.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_users: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Absolute path of the state snapshot.
    pub fn state_path(&self) -> PathBuf {
        let file = Path::new(&self.bot.state_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            PathBuf::from(shellexpand(&self.bot.data_dir)).join(file)
        }
    }

    /// Directory for log files.
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.bot.data_dir)).join("logs")
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<(), NudgeError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(NudgeError::Config(
                "telegram bot_token is empty. Set it in config.toml or TELEGRAM_BOT_TOKEN env var."
                    .into(),
            ));
        }
        if self.reminder.lead_minutes == 0 {
            return Err(NudgeError::Config(
                "reminder.lead_minutes must be at least 1".into(),
            ));
        }
        if self.scheduler.delivery_timeout_secs == 0 {
            return Err(NudgeError::Config(
                "scheduler.delivery_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides on top of file values.
    ///
    /// Recognized: `TELEGRAM_BOT_TOKEN`, `REMINDER_MINUTES`, `TZ`, `BOT_DEBUG`.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(raw) = lookup("REMINDER_MINUTES").filter(|v| !v.is_empty()) {
            match raw.trim().parse::<u64>() {
                Ok(minutes) => self.reminder.lead_minutes = minutes,
                Err(e) => warn!("ignoring REMINDER_MINUTES={raw}: {e}"),
            }
        }
        if let Some(tz) = lookup("TZ").filter(|v| !v.is_empty()) {
            self.reminder.timezone = tz;
        }
        if let Some(raw) = lookup("BOT_DEBUG").filter(|v| !v.is_empty()) {
            match raw.trim().parse::<bool>() {
                Ok(true) => self.bot.log_level = "debug".to_string(),
                Ok(false) => {}
                Err(e) => warn!("ignoring BOT_DEBUG={raw}: {e}"),
            }
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, then the process environment.
///
/// Falls back to defaults if the file does not exist. A `.env` file in the
/// working directory is read first when present.
pub fn load(path: &str) -> Result<Config, NudgeError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!("failed to read .env: {e}");
        }
    }

    let mut config = load_file(path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration from a TOML file only.
pub fn load_file(path: &str) -> Result<Config, NudgeError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| NudgeError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| NudgeError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
