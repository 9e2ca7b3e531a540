use chrono::{DateTime, Utc};
use serde::Serialize;

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

/// Counters and timestamps reported by `RegQueryInfoKeyW`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub subkeys: u32,
    pub values: u32,
    /// In UTF-16 units, without terminator
    pub max_subkey_name_len: u32,
    /// In UTF-16 units, without terminator
    pub max_value_name_len: u32,
    /// In bytes
    pub max_value_data_len: u32,

    #[serde(serialize_with = "serialize_timestamp")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_write: Option<DateTime<Utc>>,
}

/// Convert a FILETIME tick count to UTC; zero means "never written".
#[must_use]
pub fn filetime_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    if ticks == 0 {
        return None;
    }
    let secs = i64::try_from(ticks / FILETIME_TICKS_PER_SEC).ok()? - FILETIME_UNIX_OFFSET_SECS;
    #[allow(clippy::cast_possible_truncation)]
    let nanos = ((ticks % FILETIME_TICKS_PER_SEC) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

fn serialize_timestamp<S>(time: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match time {
        Some(t) => serializer.serialize_some(&t.timestamp()),
        None => serializer.serialize_none(),
    }
}
