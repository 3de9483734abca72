//! Human-readable sizes and relative times for listings.

use chrono::{DateTime, Utc};

const SIZE_SUFFIXES: &[&str] = &["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Format a byte count in decimal units: `1 Byte`, `512 Bytes`, `1.5 kB`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 1 {
        return "1 Byte".to_string();
    }
    if bytes < 1000 {
        return format!("{} Bytes", bytes);
    }

    let value = bytes as f64;
    let mut unit = 1000.0_f64;
    for suffix in SIZE_SUFFIXES {
        if value < unit * 1000.0 {
            return format!("{:.1} {}", value / unit, suffix);
        }
        unit *= 1000.0;
    }

    format!("{:.1} {}", value / (unit / 1000.0), SIZE_SUFFIXES[SIZE_SUFFIXES.len() - 1])
}

/// Describe `then` relative to `now`: `now`, `3 minutes ago`, `a day from now`.
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    let future = delta.num_seconds() < 0;
    let seconds = delta.num_seconds().unsigned_abs();

    if seconds == 0 {
        return "now".to_string();
    }

    let phrase = describe_span(seconds);
    if future {
        format!("{} from now", phrase)
    } else {
        format!("{} ago", phrase)
    }
}

fn describe_span(seconds: u64) -> String {
    let days = seconds / 86_400;

    if days == 0 {
        return match seconds {
            1 => "a second".to_string(),
            2..=59 => format!("{} seconds", seconds),
            60..=119 => "a minute".to_string(),
            120..=3_599 => format!("{} minutes", seconds / 60),
            3_600..=7_199 => "an hour".to_string(),
            _ => format!("{} hours", seconds / 3_600),
        };
    }

    let years = days / 365;
    if years == 0 {
        let months = (days as f64 / 30.5) as u64;
        return match (days, months) {
            (1, _) => "a day".to_string(),
            (_, 0) => format!("{} days", days),
            (_, 1) => "a month".to_string(),
            (_, _) => format!("{} months", months),
        };
    }

    if years > 1 {
        return format!("{} years", years);
    }

    let days = days % 365;
    let months = (days as f64 / 30.5) as u64;
    match (days, months) {
        (0, _) => "a year".to_string(),
        (1, _) => "1 year, 1 day".to_string(),
        (_, 0) => format!("1 year, {} days", days),
        (_, 1) => "1 year, 1 month".to_string(),
        (_, _) => format!("1 year, {} months", months),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(1), "1 Byte");
        assert_eq!(format_size(999), "999 Bytes");
    }

    #[test]
    fn test_format_size_decimal_units() {
        assert_eq!(format_size(1000), "1.0 kB");
        assert_eq!(format_size(1500), "1.5 kB");
        assert_eq!(format_size(4096), "4.1 kB");
        assert_eq!(format_size(1_000_000), "1.0 MB");
        assert_eq!(format_size(3_200_000_000), "3.2 GB");
    }

    #[test]
    fn test_format_relative_past() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(format_relative(now, now), "now");
        assert_eq!(format_relative(now - Duration::seconds(1), now), "a second ago");
        assert_eq!(format_relative(now - Duration::seconds(42), now), "42 seconds ago");
        assert_eq!(format_relative(now - Duration::seconds(90), now), "a minute ago");
        assert_eq!(format_relative(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(format_relative(now - Duration::minutes(61), now), "an hour ago");
        assert_eq!(format_relative(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_relative(now - Duration::days(1), now), "a day ago");
        assert_eq!(format_relative(now - Duration::days(12), now), "12 days ago");
        assert_eq!(format_relative(now - Duration::days(40), now), "a month ago");
        assert_eq!(format_relative(now - Duration::days(100), now), "3 months ago");
        assert_eq!(format_relative(now - Duration::days(365), now), "a year ago");
        assert_eq!(format_relative(now - Duration::days(366), now), "1 year, 1 day ago");
        assert_eq!(format_relative(now - Duration::days(375), now), "1 year, 10 days ago");
        assert_eq!(format_relative(now - Duration::days(400), now), "1 year, 1 month ago");
        assert_eq!(format_relative(now - Duration::days(500), now), "1 year, 4 months ago");
        assert_eq!(format_relative(now - Duration::days(1000), now), "2 years ago");
    }

    #[test]
    fn test_format_relative_future() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(format_relative(now + Duration::hours(3), now), "3 hours from now");
    }
}
