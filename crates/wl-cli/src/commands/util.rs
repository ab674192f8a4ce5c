//! Shared formatting helpers for command output.

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats minutes as a duration string.
///
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour. Negative durations are
/// treated as 0m.
pub fn format_minutes(minutes: i64) -> String {
    if minutes <= 0 {
        return "0m".to_string();
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

/// Formats a timestamp for display, second precision.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
