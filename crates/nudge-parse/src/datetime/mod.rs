//! Date/time fragment resolution.
//!
//! A fragment is tried against an ordered list of patterns; the first one
//! that matches wins. Patterns without an explicit date roll forward to the
//! next future occurrence. The order matters: later patterns are looser and
//! would otherwise shadow fully-qualified dates.

#[cfg(test)]
mod tests;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use nudge_core::error::NudgeError;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Timezone used to interpret user-supplied wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Named(Tz),
    /// Host local time. Used when the configured name does not resolve.
    Local,
}

impl Zone {
    /// Resolve an IANA zone name, falling back to host local time.
    pub fn resolve(name: &str) -> Self {
        match name.trim().parse::<Tz>() {
            Ok(tz) => Self::Named(tz),
            Err(e) => {
                warn!("unknown timezone '{name}' ({e}), falling back to local time");
                Self::Local
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Named(tz) => tz.name().to_string(),
            Self::Local => "local".to_string(),
        }
    }

    /// `now` as wall-clock time in this zone.
    pub fn now_in(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Named(tz) => now.with_timezone(tz).fixed_offset(),
            Self::Local => now.with_timezone(&chrono::Local).fixed_offset(),
        }
    }

    /// Attach this zone to a wall-clock time.
    ///
    /// Ambiguous times take the earlier offset; times inside a DST gap
    /// move one hour later.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.earliest(naive)
            .or_else(|| self.earliest(naive + Duration::hours(1)))
    }

    fn earliest(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Named(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            Self::Local => chrono::Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
        }
    }
}

/// The recognized fragment shapes, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// `DD.MM.YYYY в HH:MM` (or `HH.MM`). Taken as-is, even if in the past.
    ExplicitDate,
    /// `DD.MM HH:MM`, current year; rolls one year forward if past.
    DayMonth,
    /// `Завтра в H`: tomorrow at H:00.
    TomorrowAt,
    /// `в HH:MM`: today, or tomorrow if already past.
    TimeOnlyToday,
    /// `в H`: today at H:00, or tomorrow if already past.
    HourToday,
    /// Bare `HH:MM`: today, or tomorrow if already past.
    BareTime,
}

struct Patterns {
    explicit_date: Regex,
    day_month: Regex,
    tomorrow_at: Regex,
    time_only: Regex,
    hour_only: Regex,
    bare_time: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        explicit_date: Regex::new(r"(\d{2}\.\d{2}\.\d{4})\s+в\s+(\d{2})[:.](\d{2})")
            .expect("valid regex"),
        day_month: Regex::new(r"(\d{2})\.(\d{2})\s+(\d{2}):(\d{2})").expect("valid regex"),
        tomorrow_at: Regex::new(r"(?i)завтра\s+в\s+(\d{1,2})").expect("valid regex"),
        time_only: Regex::new(r"(?i)\bв\s+(\d{1,2})[:.](\d{2})").expect("valid regex"),
        hour_only: Regex::new(r"(?i)\bв\s+(\d{1,2})").expect("valid regex"),
        bare_time: Regex::new(r"^(\d{1,2})[:.](\d{2})$").expect("valid regex"),
    })
}

impl Pattern {
    /// Precedence order. The first matching pattern wins.
    pub const ORDER: [Pattern; 6] = [
        Pattern::ExplicitDate,
        Pattern::DayMonth,
        Pattern::TomorrowAt,
        Pattern::TimeOnlyToday,
        Pattern::HourToday,
        Pattern::BareTime,
    ];

    /// Try this pattern alone. `now` must already be in `zone`.
    pub fn apply(
        self,
        text: &str,
        now: DateTime<FixedOffset>,
        zone: Zone,
    ) -> Option<DateTime<FixedOffset>> {
        let p = patterns();
        let today = now.date_naive();

        match self {
            Self::ExplicitDate => {
                let caps = p.explicit_date.captures(text)?;
                let date = NaiveDate::parse_from_str(&caps[1], "%d.%m.%Y").ok()?;
                at_clock(date, clock(&caps, 2, Some(3))?, zone)
            }
            Self::DayMonth => {
                let caps = p.day_month.captures(text)?;
                let day = caps[1].parse().ok()?;
                let month = caps[2].parse().ok()?;
                let hour = caps[3].parse().ok()?;
                let minute = caps[4].parse().ok()?;
                let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
                let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
                let dt = zone.localize(date.and_time(time))?;
                if dt < now {
                    zone.localize(next_year(date)?.and_time(time))
                } else {
                    Some(dt)
                }
            }
            Self::TomorrowAt => {
                let caps = p.tomorrow_at.captures(text)?;
                at_clock(today.succ_opt()?, clock(&caps, 1, None)?, zone)
            }
            Self::TimeOnlyToday => {
                let caps = p.time_only.captures(text)?;
                roll_forward(today, clock(&caps, 1, Some(2))?, now, zone)
            }
            Self::HourToday => {
                let caps = p.hour_only.captures(text)?;
                roll_forward(today, clock(&caps, 1, None)?, now, zone)
            }
            Self::BareTime => {
                let caps = p.bare_time.captures(text.trim())?;
                roll_forward(today, clock(&caps, 1, Some(2))?, now, zone)
            }
        }
    }
}

/// Offset from midnight for hour/minute capture groups.
///
/// Values past 23:59 carry over: `10:75` is 11:15, `25:00` is 01:00 of
/// the following day.
fn clock(caps: &Captures<'_>, hour: usize, minute: Option<usize>) -> Option<Duration> {
    let h: i64 = caps.get(hour)?.as_str().parse().ok()?;
    let m: i64 = match minute {
        Some(i) => caps.get(i)?.as_str().parse().ok()?,
        None => 0,
    };
    Some(Duration::hours(h) + Duration::minutes(m))
}

/// `date` at midnight plus `offset`, in `zone`.
fn at_clock(date: NaiveDate, offset: Duration, zone: Zone) -> Option<DateTime<FixedOffset>> {
    let naive = date.and_hms_opt(0, 0, 0)?.checked_add_signed(offset)?;
    zone.localize(naive)
}

/// Same day and month one year later. 29 February becomes 1 March.
fn next_year(date: NaiveDate) -> Option<NaiveDate> {
    let year = date.year() + 1;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

/// Today at `offset`, or the same clock tomorrow if that is already past.
fn roll_forward(
    today: NaiveDate,
    offset: Duration,
    now: DateTime<FixedOffset>,
    zone: Zone,
) -> Option<DateTime<FixedOffset>> {
    let dt = at_clock(today, offset, zone)?;
    if dt < now {
        at_clock(today.succ_opt()?, offset, zone)
    } else {
        Some(dt)
    }
}

/// Resolves date/time fragments in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct DateTimeParser {
    zone: Zone,
}

impl DateTimeParser {
    pub fn new(zone: Zone) -> Self {
        Self { zone }
    }

    /// Parser for a zone name; unknown names fall back to local time.
    pub fn for_timezone(name: &str) -> Self {
        Self::new(Zone::resolve(name))
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Resolve `text` relative to `now`.
    pub fn parse(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<FixedOffset>, NudgeError> {
        let local_now = self.zone.now_in(now);
        for pattern in Pattern::ORDER {
            if let Some(dt) = pattern.apply(text, local_now, self.zone) {
                debug!("'{text}' matched {pattern:?} -> {dt}");
                return Ok(dt);
            }
        }
        Err(NudgeError::Parse(format!(
            "unrecognized date/time: '{text}'"
        )))
    }

    /// Resolve `text` relative to the wall clock.
    pub fn parse_now(&self, text: &str) -> Result<DateTime<FixedOffset>, NudgeError> {
        self.parse(text, Utc::now())
    }
}
