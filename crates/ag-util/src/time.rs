// time.rs — Minute-of-day arithmetic and the timezone-aware clock.
//
// Policy time windows are expressed as "HH:MM" strings and compared as
// minutes since local midnight. A window where after > before wraps past
// midnight (e.g. 23:00–08:00 covers the night). The clock resolves a named
// IANA zone so "08:00" means 08:00 where the operator lives, not UTC.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Sentinel returned by [`parse_time_minutes`] for unparseable input.
pub const INVALID_MINUTES: i32 = -1;

/// Parse an "HH:MM" string into minutes since midnight.
///
/// Accepts 00:00 through 23:59. Returns [`INVALID_MINUTES`] on any parse
/// failure — callers treat the sentinel as "window never matches" rather
/// than an error.
pub fn parse_time_minutes(s: &str) -> i32 {
    let Some((hh, mm)) = s.split_once(':') else {
        return INVALID_MINUTES;
    };
    let (Ok(hours), Ok(minutes)) = (hh.trim().parse::<i32>(), mm.trim().parse::<i32>()) else {
        return INVALID_MINUTES;
    };
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return INVALID_MINUTES;
    }
    hours * 60 + minutes
}

/// Check whether `now` (minutes since midnight) falls inside [after, before).
///
/// Three regimes:
/// - after < before: plain interval, after ≤ now < before
/// - after > before: midnight wrap, now ≥ after OR now < before
/// - after == before: matches only at exactly that minute
pub fn in_time_range(now: i32, after: i32, before: i32) -> bool {
    if after == before {
        return now == after;
    }
    if after < before {
        now >= after && now < before
    } else {
        now >= after || now < before
    }
}

/// A snapshot of the wall clock in a named zone, taken once per evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeContext {
    /// Hour of day, 0–23, in the configured zone.
    pub hour: u32,
    /// Minute of hour, 0–59.
    pub minute: u32,
    /// Day of week in the configured zone.
    pub weekday: Weekday,
    /// Calendar date in the configured zone.
    pub date: NaiveDate,
    /// The zone name this snapshot was taken in.
    pub zone: String,
}

impl TimeContext {
    /// Minutes since local midnight — the unit time conditions compare in.
    pub fn minutes_of_day(&self) -> i32 {
        (self.hour * 60 + self.minute) as i32
    }
}

/// Resolve an IANA zone name, falling back to UTC when unrecognised.
///
/// Resolve once at configuration time and reuse the `Tz`; the fallback
/// warning would otherwise repeat on every evaluation.
pub fn parse_zone(zone: &str) -> Tz {
    match zone.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(zone, "unknown IANA timezone, falling back to UTC");
            chrono_tz::UTC
        }
    }
}

/// Take a [`TimeContext`] snapshot in an already-resolved zone.
pub fn current_time_in(tz: Tz) -> TimeContext {
    let now: DateTime<Tz> = Utc::now().with_timezone(&tz);
    TimeContext {
        hour: now.hour(),
        minute: now.minute(),
        weekday: now.weekday(),
        date: now.date_naive(),
        zone: tz.name().to_string(),
    }
}

/// Take a [`TimeContext`] snapshot in the named IANA zone.
pub fn current_time(zone: &str) -> TimeContext {
    current_time_in(parse_zone(zone))
}

/// Match a weekday against a set of day names.
///
/// Accepts short ("mon") and full ("monday") forms, case-insensitively.
/// An empty set matches every day.
pub fn weekday_matches(weekday: Weekday, names: &[String]) -> bool {
    if names.is_empty() {
        return true;
    }
    let (short, full) = weekday_names(weekday);
    names
        .iter()
        .any(|n| n.eq_ignore_ascii_case(short) || n.eq_ignore_ascii_case(full))
}

fn weekday_names(weekday: Weekday) -> (&'static str, &'static str) {
    match weekday {
        Weekday::Mon => ("mon", "monday"),
        Weekday::Tue => ("tue", "tuesday"),
        Weekday::Wed => ("wed", "wednesday"),
        Weekday::Thu => ("thu", "thursday"),
        Weekday::Fri => ("fri", "friday"),
        Weekday::Sat => ("sat", "saturday"),
        Weekday::Sun => ("sun", "sunday"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_boundaries() {
        assert_eq!(parse_time_minutes("00:00"), 0);
        assert_eq!(parse_time_minutes("23:59"), 1439);
        assert_eq!(parse_time_minutes("08:30"), 510);
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert_eq!(parse_time_minutes("24:00"), INVALID_MINUTES);
        assert_eq!(parse_time_minutes("12:60"), INVALID_MINUTES);
        assert_eq!(parse_time_minutes("-1:00"), INVALID_MINUTES);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_time_minutes(""), INVALID_MINUTES);
        assert_eq!(parse_time_minutes("noon"), INVALID_MINUTES);
        assert_eq!(parse_time_minutes("12"), INVALID_MINUTES);
        assert_eq!(parse_time_minutes("12:xx"), INVALID_MINUTES);
    }

    #[test]
    fn plain_interval() {
        let after = parse_time_minutes("09:00");
        let before = parse_time_minutes("17:00");
        assert!(in_time_range(parse_time_minutes("09:00"), after, before));
        assert!(in_time_range(parse_time_minutes("12:30"), after, before));
        assert!(!in_time_range(parse_time_minutes("17:00"), after, before));
        assert!(!in_time_range(parse_time_minutes("08:59"), after, before));
    }

    #[test]
    fn midnight_wrap() {
        let after = parse_time_minutes("23:00");
        let before = parse_time_minutes("08:00");
        assert!(in_time_range(parse_time_minutes("23:30"), after, before));
        assert!(in_time_range(parse_time_minutes("03:15"), after, before));
        assert!(!in_time_range(parse_time_minutes("08:00"), after, before));
        assert!(!in_time_range(parse_time_minutes("12:00"), after, before));
    }

    #[test]
    fn degenerate_window_matches_single_minute() {
        let at = parse_time_minutes("12:00");
        assert!(in_time_range(at, at, at));
        assert!(!in_time_range(at + 1, at, at));
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        let ctx = current_time("Not/AZone");
        assert_eq!(ctx.zone, "UTC");
    }

    #[test]
    fn known_zone_resolves() {
        let ctx = current_time("Europe/Berlin");
        assert_eq!(ctx.zone, "Europe/Berlin");
        assert!(ctx.hour < 24);
    }

    #[test]
    fn weekday_matching_accepts_both_forms() {
        let days = vec!["Mon".to_string(), "friday".to_string()];
        assert!(weekday_matches(Weekday::Mon, &days));
        assert!(weekday_matches(Weekday::Fri, &days));
        assert!(!weekday_matches(Weekday::Sun, &days));
    }

    #[test]
    fn empty_day_set_matches_all() {
        assert!(weekday_matches(Weekday::Wed, &[]));
    }

    #[test]
    fn minutes_of_day() {
        let ctx = TimeContext {
            hour: 3,
            minute: 15,
            weekday: Weekday::Tue,
            date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            zone: "UTC".to_string(),
        };
        assert_eq!(ctx.minutes_of_day(), 195);
    }
}
