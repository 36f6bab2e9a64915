//! Best-effort date/time extraction from proposal text.
//!
//! Resolves phrases like "tomorrow at 4 PM" or "saturday at 6:30" to a
//! concrete instant in US Eastern, preferring future occurrences. A datetime
//! is produced only when an explicit clock-time token is present; schedule
//! words alone anchor a date but never invent a time ("no confident parse").

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday,
};
use regex::Regex;

static MERIDIEM_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s?(am|pm)\b").expect("valid pattern"));

static HOUR_MINUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("valid pattern"));

const EST: i32 = 5 * 3600;
const EDT: i32 = 4 * 3600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DateAnchor {
    Tomorrow,
    Weekday(Weekday),
    Weekend,
    Today,
}

/// Rule-based extractor for "when does this session happen".
#[derive(Clone, Copy, Debug, Default)]
pub struct WhenParser;

impl WhenParser {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the text against a reference instant. Deterministic for a
    /// fixed `now`; `None` means no time could be determined.
    pub fn parse(&self, text: &str, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let lowered = text.to_lowercase();
        let time = clock_time(&lowered)?;

        let date = match date_anchor(&lowered) {
            Some(DateAnchor::Tomorrow) => now.date_naive() + Duration::days(1),
            Some(DateAnchor::Weekday(target)) => next_weekday(now, target, time),
            Some(DateAnchor::Weekend) => next_weekday(now, Weekday::Sat, time),
            Some(DateAnchor::Today) | None => {
                // Earlier of {today, tomorrow} that is strictly in the future.
                if time > now.time() {
                    now.date_naive()
                } else {
                    now.date_naive() + Duration::days(1)
                }
            }
        };

        in_eastern(date.and_time(time))
    }
}

/// Current instant in US Eastern.
pub fn eastern_now() -> DateTime<FixedOffset> {
    let utc = Utc::now();
    utc.with_timezone(&eastern_offset(utc))
}

/// "Friday, November 21, 2025 at 4:00 PM (ET)"
pub fn format_when(when: DateTime<FixedOffset>) -> String {
    format!("{} (ET)", when.format("%A, %B %d, %Y at %-I:%M %p"))
}

fn clock_time(lowered: &str) -> Option<NaiveTime> {
    // An unusable meridiem capture ("13pm") falls through to later tokens
    // and then to the 24-hour scan.
    if let Some(time) = MERIDIEM_TIME_RE.captures_iter(lowered).find_map(|caps| meridiem_time(&caps))
    {
        return Some(time);
    }

    if let Some(caps) = HOUR_MINUTE_RE.captures(lowered) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    None
}

fn meridiem_time(caps: &regex::Captures<'_>) -> Option<NaiveTime> {
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, caps.get(3)?.as_str()) {
        (12, "am") => 0,
        (12, "pm") => 12,
        (h, "am") => h,
        (h, _) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn date_anchor(lowered: &str) -> Option<DateAnchor> {
    if lowered.contains("tomorrow") {
        return Some(DateAnchor::Tomorrow);
    }

    let weekdays = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];
    for (name, weekday) in weekdays {
        if lowered.contains(name) {
            return Some(DateAnchor::Weekday(weekday));
        }
    }

    if lowered.contains("weekend") {
        return Some(DateAnchor::Weekend);
    }

    let today_words =
        ["tonight", "today", "this afternoon", "this evening", "this morning", "after class", "after lecture", "after lab", "later"];
    if today_words.iter().any(|word| lowered.contains(word)) {
        return Some(DateAnchor::Today);
    }

    None
}

fn next_weekday(now: DateTime<FixedOffset>, target: Weekday, time: NaiveTime) -> NaiveDate {
    let days_ahead = (i64::from(target.num_days_from_monday())
        - i64::from(now.weekday().num_days_from_monday())
        + 7)
        % 7;
    // The named day is today: keep today only if the time is still ahead.
    if days_ahead == 0 && time <= now.time() {
        return now.date_naive() + Duration::days(7);
    }
    now.date_naive() + Duration::days(days_ahead)
}

fn in_eastern(local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    let seconds = if in_dst(local) { EDT } else { EST };
    local.and_local_timezone(FixedOffset::west_opt(seconds)?).single()
}

/// Civil DST rule for US Eastern: EDT from 2:00 on the second Sunday of
/// March until 2:00 on the first Sunday of November.
fn in_dst(local: NaiveDateTime) -> bool {
    let year = local.year();
    let Some(start) = nth_sunday(year, 3, 2).and_then(|d| d.and_hms_opt(2, 0, 0)) else {
        return false;
    };
    let Some(end) = nth_sunday(year, 11, 1).and_then(|d| d.and_hms_opt(2, 0, 0)) else {
        return false;
    };
    local >= start && local < end
}

fn nth_sunday(year: i32, month: u32, nth: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let to_sunday = (7 - first.weekday().num_days_from_sunday()) % 7;
    first.checked_add_signed(Duration::days(i64::from(to_sunday + (nth - 1) * 7)))
}

fn eastern_offset(utc: DateTime<Utc>) -> FixedOffset {
    let est = FixedOffset::west_opt(EST).expect("EST offset is in range");
    let local = utc.with_timezone(&est).naive_local();
    if in_dst(local) {
        FixedOffset::west_opt(EDT).expect("EDT offset is in range")
    } else {
        est
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};

    use super::{format_when, WhenParser};

    // 2025-11-21 is a Friday; US Eastern is on standard time (UTC-5).
    fn reference(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        NaiveDate::from_ymd_opt(2025, 11, 21)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .and_then(|naive| {
                naive.and_local_timezone(FixedOffset::west_opt(5 * 3600).expect("offset")).single()
            })
            .expect("valid reference instant")
    }

    #[test]
    fn tomorrow_with_meridiem_time_resolves_to_next_day() {
        let now = reference(12, 0);
        let when = WhenParser::new()
            .parse("want to study together tomorrow at 4 PM", now)
            .expect("should parse");

        assert_eq!(when.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 22).expect("date"));
        assert_eq!((when.hour(), when.minute()), (16, 0));
    }

    #[test]
    fn clock_time_alone_falls_back_to_today_when_still_ahead() {
        let now = reference(12, 0);
        let when = WhenParser::new().parse("see you at 5pm", now).expect("should parse");

        assert_eq!(when.date_naive(), now.date_naive());
        assert_eq!(when.hour(), 17);
    }

    #[test]
    fn clock_time_alone_rolls_to_tomorrow_once_passed() {
        let now = reference(18, 30);
        let when = WhenParser::new().parse("see you at 5pm", now).expect("should parse");

        assert_eq!(when.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 22).expect("date"));
        assert_eq!(when.hour(), 17);
    }

    #[test]
    fn weekday_anchor_resolves_to_next_occurrence() {
        let now = reference(12, 0);
        let when =
            WhenParser::new().parse("review session saturday at 6:30", now).expect("should parse");

        // 24-hour reading without a meridiem.
        assert_eq!(when.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 22).expect("date"));
        assert_eq!((when.hour(), when.minute()), (6, 30));
    }

    #[test]
    fn same_weekday_with_passed_time_rolls_a_full_week() {
        let now = reference(18, 0);
        let when =
            WhenParser::new().parse("study friday at 4pm", now).expect("should parse");

        assert_eq!(when.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 28).expect("date"));
    }

    #[test]
    fn schedule_word_without_clock_time_yields_nothing() {
        let now = reference(12, 0);
        assert!(WhenParser::new().parse("let's study tomorrow", now).is_none());
        assert!(WhenParser::new().parse("study group this weekend?", now).is_none());
    }

    #[test]
    fn plain_text_yields_nothing() {
        let now = reference(12, 0);
        assert!(WhenParser::new().parse("let's grab lunch", now).is_none());
    }

    #[test]
    fn parse_is_idempotent_for_a_fixed_reference_instant() {
        let now = reference(9, 15);
        let parser = WhenParser::new();
        let first = parser.parse("meet up tomorrow at 7:30pm", now);
        let second = parser.parse("meet up tomorrow at 7:30pm", now);

        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn unusable_meridiem_hour_falls_back_to_hour_minute_scan() {
        let now = reference(9, 0);
        let when = WhenParser::new()
            .parse("study tomorrow, 13pm or 16:00 works", now)
            .expect("should parse the 24-hour token");

        assert_eq!((when.hour(), when.minute()), (16, 0));
        assert_eq!(when.date_naive(), NaiveDate::from_ymd_opt(2025, 11, 22).expect("date"));

        // Without a usable fallback token there is still no parse.
        assert!(WhenParser::new().parse("study tomorrow at 13pm", now).is_none());
    }

    #[test]
    fn noon_and_midnight_meridiems_are_handled() {
        let now = reference(9, 0);
        let parser = WhenParser::new();

        let noon = parser.parse("study session tomorrow at 12pm", now).expect("noon");
        assert_eq!(noon.hour(), 12);

        let midnight = parser.parse("study session tomorrow at 12am", now).expect("midnight");
        assert_eq!(midnight.hour(), 0);
    }

    #[test]
    fn summer_dates_resolve_with_daylight_offset() {
        // 2025-07-10 is a Thursday, inside EDT.
        let now = NaiveDate::from_ymd_opt(2025, 7, 10)
            .and_then(|date| date.and_hms_opt(10, 0, 0))
            .and_then(|naive| {
                naive.and_local_timezone(FixedOffset::west_opt(4 * 3600).expect("offset")).single()
            })
            .expect("valid reference instant");

        let when = WhenParser::new().parse("practice at 5pm", now).expect("should parse");
        assert_eq!(when.offset().utc_minus_local(), 4 * 3600);
    }

    #[test]
    fn formatting_matches_the_announcement_style() {
        let now = reference(9, 0);
        let when = WhenParser::new().parse("study friday at 4pm", now).expect("should parse");

        assert_eq!(format_when(when), "Friday, November 21, 2025 at 4:00 PM (ET)");
    }
}
