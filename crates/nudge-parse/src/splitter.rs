//! Split an inbound message into an action phrase and a date/time phrase.
//!
//! Accepted layouts:
//! - `Action DD.MM.YYYY в HH:MM` on one line (or the date on its own line)
//! - one line containing `в HH:MM` or `в H` somewhere
//! - two or more lines: the last line is the date/time, the one before it
//!   is the action

use nudge_core::error::NudgeError;
use regex::Regex;
use std::sync::OnceLock;

/// Result of splitting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub action: String,
    /// Date/time fragment, ready for `DateTimeParser::parse`.
    pub fragment: String,
}

struct Layouts {
    dated: Regex,
    time: Regex,
    hour: Regex,
}

fn layouts() -> &'static Layouts {
    static LAYOUTS: OnceLock<Layouts> = OnceLock::new();
    LAYOUTS.get_or_init(|| Layouts {
        dated: Regex::new(r"^(.+?)\s+(\d{2}\.\d{2}\.\d{4})\s+в\s+(\d{2})[:.](\d{2})")
            .expect("valid regex"),
        time: Regex::new(r"(?i)\bв\s+(\d{1,2})[:.](\d{2})").expect("valid regex"),
        hour: Regex::new(r"(?i)\bв\s+(\d{1,2})").expect("valid regex"),
    })
}

/// Split `text` into action and date/time fragment.
pub fn split(text: &str) -> Result<Split, NudgeError> {
    let text = text.trim();
    let l = layouts();

    if let Some(caps) = l.dated.captures(text) {
        return finish(
            caps[1].to_string(),
            format!("{} в {}:{}", &caps[2], &caps[3], &caps[4]),
        );
    }

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [] => Err(NudgeError::Parse("empty message".into())),
        [line] => {
            if let Some(caps) = l.time.captures(line) {
                let Some(m) = caps.get(0) else {
                    return Err(NudgeError::Parse(format!("no time in '{line}'")));
                };
                finish(
                    without(line, m.start(), m.end()),
                    format!("{}:{}", &caps[1], &caps[2]),
                )
            } else if let Some(caps) = l.hour.captures(line) {
                let Some(m) = caps.get(0) else {
                    return Err(NudgeError::Parse(format!("no time in '{line}'")));
                };
                finish(
                    without(line, m.start(), m.end()),
                    format!("Завтра в {}", &caps[1]),
                )
            } else {
                Err(NudgeError::Parse(format!("no time in '{line}'")))
            }
        }
        [.., action, fragment] => finish(action.to_string(), fragment.to_string()),
    }
}

/// `line` with the byte range `start..end` cut out and whitespace collapsed.
fn without(line: &str, start: usize, end: usize) -> String {
    format!("{} {}", &line[..start], &line[end..])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn finish(action: String, fragment: String) -> Result<Split, NudgeError> {
    let action = action.trim().to_string();
    if action.is_empty() {
        return Err(NudgeError::Parse("empty action".into()));
    }
    Ok(Split {
        action,
        fragment: fragment.trim().to_string(),
    })
}
