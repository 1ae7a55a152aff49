//! Bot commands: /start, /help, /list.

use nudge_memory::ReminderStore;

/// Known commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    List,
}

impl Command {
    /// Parse a command name as returned by `IncomingMessage::command`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

pub const START_TEXT: &str = "👋 Привет! Я бот для напоминаний. Отправь мне сообщение в формате:\n\n\
Действие\nДД.ММ.ГГГГ в ЧЧ:ММ\n\n\
Например:\nПозвонить маме\n13.03.2025 в 21:04";

pub const HELP_TEXT: &str = "📝 Поддерживаемые форматы даты:\n\n\
1. ДД.ММ.ГГГГ в ЧЧ:ММ\n\
2. ДД.ММ ЧЧ:ММ\n\
3. Завтра в Х\n\
4. в ЧЧ:ММ (сегодня/завтра)\n\
5. в Х (сегодня/завтра)\n\
6. ЧЧ:ММ";

/// Pending reminders of one chat, soonest first.
pub async fn list_text(store: &ReminderStore, chat_id: i64) -> String {
    let reminders = store.for_chat(chat_id).await;
    if reminders.is_empty() {
        return "Нет запланированных напоминаний.".to_string();
    }

    let mut out = String::from("📋 Запланированные напоминания:\n");
    for (i, r) in reminders.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} - {}",
            i + 1,
            r.fire_at.format("%H:%M %d.%m.%Y"),
            r.action
        ));
    }
    out
}
