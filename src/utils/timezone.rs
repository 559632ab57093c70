//! Time zone conversion.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Converts a UTC instant into the named IANA zone. Unknown zones yield `None`.
pub fn to_time_zone(time: DateTime<Utc>, zone: &str) -> Option<DateTime<Tz>> {
    let tz: Tz = zone.parse().ok()?;
    Some(time.with_timezone(&tz))
}

/// Formats a UTC instant in the named zone; unknown zones format as UTC.
pub fn format_in_zone(time: DateTime<Utc>, zone: &str, format: &str) -> String {
    match to_time_zone(time, zone) {
        Some(local) => local.format(format).to_string(),
        None => time.format(format).to_string(),
    }
}
