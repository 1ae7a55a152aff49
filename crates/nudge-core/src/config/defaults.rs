//! Serde default values for configuration fields.

pub(super) fn default_name() -> String {
    "Nudge".to_string()
}
pub(super) fn default_data_dir() -> String {
    "~/.nudge".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_state_file() -> String {
    "bot_state.json".to_string()
}
pub(super) fn default_lead_minutes() -> u64 {
    10
}
pub(super) fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}
pub(super) fn default_topic_name() -> String {
    "📅 Напоминания".to_string()
}
pub(super) fn default_true() -> bool {
    true
}
pub(super) fn default_delivery_timeout() -> u64 {
    10
}
pub(super) fn default_request_timeout() -> u64 {
    10
}
