pub mod chat;
pub mod feed;
pub mod preferences;
pub mod thread;

use chrono::{ DateTime, NaiveDateTime, Utc };
use serde::{ Deserialize, Deserializer };

/// The backend writes naive UTC timestamps (`2024-05-01T10:00:00.123`) for
/// some documents and RFC 3339 for others. Anything unreadable becomes `None`.
pub(crate) fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where D: Deserializer<'de>
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| parse_time(&s)))
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
