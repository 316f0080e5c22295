//! Relative age labels for chat timestamps ("just now", "3 minutes ago", ...)

use chrono::{DateTime, NaiveDate, Utc};

/// Parse a timestamp string, treating zone-less ISO-8601 as UTC.
/// A bare `YYYY-MM-DD` date is midnight UTC.
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .or_else(|_| DateTime::parse_from_rfc3339(&format!("{}Z", timestamp)))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
        })
}

/// Format the age of `timestamp` relative to `now`.
///
/// Unparseable or empty timestamps yield an empty label.
pub fn time_ago(timestamp: &str, now: DateTime<Utc>) -> String {
    if timestamp.is_empty() {
        return String::new();
    }

    let Some(date) = parse_timestamp(timestamp) else {
        return String::new();
    };

    let diff_ms = (now - date).num_milliseconds();
    let diff_sec = diff_ms.div_euclid(1000);

    if diff_sec < 5 {
        return "just now".to_string();
    }
    if diff_sec < 60 {
        return format!("{} seconds ago", diff_sec);
    }

    let diff_min = diff_sec / 60;
    if diff_min < 2 {
        return "1 minute ago".to_string();
    }
    if diff_min < 60 {
        return format!("{} minutes ago", diff_min);
    }

    let diff_hours = diff_min / 60;
    if diff_hours < 2 {
        return "1 hour ago".to_string();
    }
    if diff_hours < 24 {
        return format!("{} hours ago", diff_hours);
    }

    let diff_days = diff_hours / 24;
    if diff_days < 2 {
        return "1 day ago".to_string();
    }
    format!("{} days ago", diff_days)
}
