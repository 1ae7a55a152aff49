use super::*;
use chrono_tz::Europe::Moscow;

fn moscow() -> DateTimeParser {
    DateTimeParser::new(Zone::Named(Moscow))
}

/// Moscow wall-clock time as a UTC instant.
fn at(local: &str) -> DateTime<Utc> {
    let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M").unwrap();
    Moscow
        .from_local_datetime(&naive)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

fn local(dt: DateTime<FixedOffset>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[test]
fn test_explicit_date_ignores_now() {
    let parser = moscow();
    for now in ["2020-01-01T00:00", "2025-03-13T22:00", "2030-07-15T12:00"] {
        let dt = parser.parse("13.03.2025 в 21:04", at(now)).unwrap();
        assert_eq!(local(dt), "2025-03-13T21:04:00", "now = {now}");
    }
}

#[test]
fn test_explicit_date_dot_separator() {
    let dt = moscow()
        .parse("13.03.2025 в 21.04", at("2025-01-01T00:00"))
        .unwrap();
    assert_eq!(local(dt), "2025-03-13T21:04:00");
}

#[test]
fn test_explicit_date_keeps_moscow_offset() {
    let dt = moscow()
        .parse("13.03.2025 в 21:04", at("2025-01-01T00:00"))
        .unwrap();
    assert_eq!(dt.offset().local_minus_utc(), 3 * 3600);
    assert_eq!(dt.to_rfc3339(), "2025-03-13T21:04:00+03:00");
}

#[test]
fn test_invalid_calendar_date_falls_through() {
    // 31.02 is not a date, so the explicit pattern is skipped and the
    // time-only pattern picks up "в 10:00".
    let dt = moscow()
        .parse("31.02.2025 в 10:00", at("2025-06-01T08:00"))
        .unwrap();
    assert_eq!(local(dt), "2025-06-01T10:00:00");
}

#[test]
fn test_day_month_rolls_to_next_year() {
    let dt = moscow()
        .parse("02.01 10:00", at("2025-12-30T12:00"))
        .unwrap();
    assert_eq!(local(dt), "2026-01-02T10:00:00");
}

#[test]
fn test_day_month_future_stays_this_year() {
    let dt = moscow()
        .parse("15.08 09:30", at("2025-06-01T12:00"))
        .unwrap();
    assert_eq!(local(dt), "2025-08-15T09:30:00");
}

#[test]
fn test_tomorrow_at_hour() {
    let dt = moscow()
        .parse("Завтра в 9", at("2025-06-01T22:00"))
        .unwrap();
    assert_eq!(local(dt), "2025-06-02T09:00:00");
}

#[test]
fn test_tomorrow_case_insensitive_and_month_end() {
    let dt = moscow()
        .parse("завтра в 18", at("2025-06-30T08:00"))
        .unwrap();
    assert_eq!(local(dt), "2025-07-01T18:00:00");
}

#[test]
fn test_time_only_rolls_one_day() {
    let dt = moscow()
        .parse("в 09:00", at("2025-06-01T22:00"))
        .unwrap();
    assert_eq!(local(dt), "2025-06-02T09:00:00");
}

#[test]
fn test_time_only_later_today() {
    let dt = moscow()
        .parse("в 23:15", at("2025-06-01T22:00"))
        .unwrap();
    assert_eq!(local(dt), "2025-06-01T23:15:00");
}

#[test]
fn test_time_equal_to_now_is_kept() {
    let dt = moscow()
        .parse("в 22:00", at("2025-06-01T22:00"))
        .unwrap();
    assert_eq!(local(dt), "2025-06-01T22:00:00");
}

#[test]
fn test_hour_only_rolls_one_day() {
    let dt = moscow().parse("в 7", at("2025-06-01T22:00")).unwrap();
    assert_eq!(local(dt), "2025-06-02T07:00:00");
}

#[test]
fn test_bare_time_rolls_one_day() {
    let dt = moscow().parse("9:05", at("2025-06-01T22:00")).unwrap();
    assert_eq!(local(dt), "2025-06-02T09:05:00");
}

#[test]
fn test_bare_time_must_be_whole_fragment() {
    assert!(moscow()
        .parse("около 9:05 наверное", at("2025-06-01T22:00"))
        .is_err());
}

#[test]
fn test_minute_overflow_carries_into_hour() {
    let now = at("2025-06-01T08:00");
    let dt = moscow().parse("в 10:75", now).unwrap();
    assert_eq!(local(dt), "2025-06-01T11:15:00");
    let zone = Zone::Named(Moscow);
    let claimed = Pattern::TimeOnlyToday.apply("в 10:75", zone.now_in(now), zone);
    assert_eq!(claimed, Some(dt));
}

#[test]
fn test_hour_overflow_carries_into_next_day() {
    let now = at("2025-06-01T08:00");
    let dt = moscow().parse("25:00", now).unwrap();
    assert_eq!(local(dt), "2025-06-02T01:00:00");
    let dt = moscow().parse("Завтра в 24", now).unwrap();
    assert_eq!(local(dt), "2025-06-03T00:00:00");
    let dt = moscow().parse("13.03.2025 в 23:90", now).unwrap();
    assert_eq!(local(dt), "2025-03-14T00:30:00");
}

#[test]
fn test_day_month_rejects_out_of_range_clock() {
    assert!(moscow()
        .parse("15.08 25:00", at("2025-06-01T08:00"))
        .is_err());
}

#[test]
fn test_day_month_leap_day_rolls_to_march_first() {
    let dt = moscow()
        .parse("29.02 10:00", at("2028-03-05T12:00"))
        .unwrap();
    assert_eq!(local(dt), "2029-03-01T10:00:00");
}

#[test]
fn test_day_month_leap_day_ahead_stays() {
    let dt = moscow()
        .parse("29.02 10:00", at("2028-01-10T12:00"))
        .unwrap();
    assert_eq!(local(dt), "2028-02-29T10:00:00");
}

#[test]
fn test_unrecognized_is_parse_error() {
    let err = moscow()
        .parse("когда-нибудь потом", at("2025-06-01T08:00"))
        .unwrap_err();
    assert!(matches!(err, NudgeError::Parse(_)));
}

#[test]
fn test_precedence_explicit_over_time_only() {
    let now = at("2025-06-01T08:00");
    let text = "13.03.2025 в 21:04";
    assert!(Pattern::TimeOnlyToday
        .apply(text, Zone::Named(Moscow).now_in(now), Zone::Named(Moscow))
        .is_some());
    let dt = moscow().parse(text, now).unwrap();
    assert_eq!(local(dt), "2025-03-13T21:04:00");
}

#[test]
fn test_patterns_in_isolation() {
    let zone = Zone::Named(Moscow);
    let now = zone.now_in(at("2025-06-01T12:00"));
    assert!(Pattern::ExplicitDate.apply("в 10:00", now, zone).is_none());
    assert!(Pattern::DayMonth.apply("в 10:00", now, zone).is_none());
    assert!(Pattern::TomorrowAt.apply("в 10", now, zone).is_none());
    assert!(Pattern::TimeOnlyToday.apply("в 10", now, zone).is_none());
    assert!(Pattern::HourToday.apply("в 10", now, zone).is_some());
    assert!(Pattern::BareTime.apply("в 10:00", now, zone).is_none());
    assert_eq!(Pattern::ORDER[0], Pattern::ExplicitDate);
    assert_eq!(Pattern::ORDER[5], Pattern::BareTime);
}

#[test]
fn test_preposition_needs_word_boundary() {
    // "ов 10" is not the preposition "в".
    assert!(moscow()
        .parse("купить 3 литров 10", at("2025-06-01T12:00"))
        .is_err());
}

#[test]
fn test_unknown_timezone_falls_back_to_local() {
    let parser = DateTimeParser::for_timezone("Mars/Olympus_Mons");
    assert_eq!(parser.zone(), Zone::Local);
    assert!(parser.parse("13.03.2025 в 21:04", Utc::now()).is_ok());
}

#[test]
fn test_dst_gap_moves_forward() {
    let zone = Zone::Named(chrono_tz::Europe::Berlin);
    let naive = NaiveDateTime::parse_from_str("2025-03-30T02:30", "%Y-%m-%dT%H:%M").unwrap();
    let dt = zone.localize(naive).unwrap();
    assert_eq!(local(dt), "2025-03-30T03:30:00");
}
