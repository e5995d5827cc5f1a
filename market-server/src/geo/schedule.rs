//! Working-hours check
//!
//! Days are 3-letter lowercase codes (`mon`..`sun`); times are `HH:MM` in the
//! business time zone, bounds inclusive. A window whose start is after its end
//! spans midnight (e.g. 22:00 - 02:00).

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use shared::models::WorkingHours;

fn day_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Parse `HH:MM` into minutes since midnight
pub fn parse_minutes(value: &str) -> Option<u32> {
    let (h, m) = value.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Whether a merchant is open at the given local time
///
/// No configured hours means always open. An unparseable window is treated as closed.
pub fn is_within_working_hours(hours: Option<&WorkingHours>, at: NaiveDateTime) -> bool {
    let Some(hours) = hours else {
        return true;
    };

    let today = day_code(at.weekday());
    if !hours.days.iter().any(|d| d.trim().eq_ignore_ascii_case(today)) {
        return false;
    }

    let (Some(start), Some(end)) = (parse_minutes(&hours.start), parse_minutes(&hours.end)) else {
        return false;
    };
    let now = at.hour() * 60 + at.minute();

    if start <= end {
        now >= start && now <= end
    } else {
        // Overnight
        now >= start || now <= end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hours(start: &str, end: &str, days: &[&str]) -> WorkingHours {
        WorkingHours {
            start: start.to_string(),
            end: end.to_string(),
            days: days.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// 2026-10-13 is a Tuesday
    fn tuesday(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_wrong_day_is_closed() {
        let wh = hours("09:00", "18:00", &["mon"]);
        assert!(!is_within_working_hours(Some(&wh), tuesday(10, 0)));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let wh = hours("09:00", "18:00", &["tue"]);
        assert!(is_within_working_hours(Some(&wh), tuesday(9, 0)));
        assert!(is_within_working_hours(Some(&wh), tuesday(18, 0)));
        assert!(!is_within_working_hours(Some(&wh), tuesday(18, 1)));
        assert!(!is_within_working_hours(Some(&wh), tuesday(8, 59)));
    }

    #[test]
    fn test_overnight_window() {
        let wh = hours("22:00", "02:00", &["tue"]);
        assert!(is_within_working_hours(Some(&wh), tuesday(23, 30)));
        assert!(is_within_working_hours(Some(&wh), tuesday(1, 15)));
        assert!(!is_within_working_hours(Some(&wh), tuesday(12, 0)));
    }

    #[test]
    fn test_absent_hours_always_open() {
        assert!(is_within_working_hours(None, tuesday(3, 0)));
    }

    #[test]
    fn test_malformed_time_is_closed() {
        let wh = hours("9am", "18:00", &["tue"]);
        assert!(!is_within_working_hours(Some(&wh), tuesday(10, 0)));
        assert_eq!(parse_minutes("24:00"), None);
        assert_eq!(parse_minutes("07:05"), Some(425));
    }
}
