//! Timestamp helpers for draw history.
//!
//! History files written by older releases store local wall-clock times as
//! `%Y-%m-%d %H:%M:%S`, sometimes ISO-8601 with a `T`, and use an empty string for
//! "never drawn". Everything here accepts all three and always writes the first.

use chrono::{Local, NaiveDateTime};

/// Format used when writing timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_FORMATS: &[&str] = &[
    TIMESTAMP_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Current local time, truncated to whole seconds like stored timestamps.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    parse_timestamp(&format_timestamp(&now)).unwrap_or(now)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp; blank or unrecognized input yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// A stored timestamp as found on disk: usually a string, occasionally `null` or a
/// number in hand-edited files.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl RawTimestamp {
    fn parse(self) -> Option<NaiveDateTime> {
        match self {
            RawTimestamp::Text(raw) => {
                let parsed = parse_timestamp(&raw);
                if parsed.is_none() && !raw.trim().is_empty() {
                    log::warn!("Ignoring unreadable timestamp {:?}", raw);
                }
                parsed
            }
            RawTimestamp::Other(_) => None,
        }
    }
}

/// Serde adapter for `Option<NaiveDateTime>` fields.
pub mod optional_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&super::format_timestamp(ts)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
        Ok(super::RawTimestamp::deserialize(deserializer)?.parse())
    }
}

/// Serde adapter for required timestamps; missing or unreadable values become the epoch.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        Ok(super::RawTimestamp::deserialize(deserializer)?
            .parse()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 2)
            .unwrap()
            .and_hms_opt(8, 15, 30)
            .unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&sample()), "2024-09-02 08:15:30");
    }

    #[test]
    fn test_parse_space_and_iso_forms() {
        assert_eq!(parse_timestamp("2024-09-02 08:15:30"), Some(sample()));
        assert_eq!(parse_timestamp("2024-09-02T08:15:30"), Some(sample()));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let parsed = parse_timestamp("2024-09-02T08:15:30.250").unwrap();
        assert_eq!(parsed.format(TIMESTAMP_FORMAT).to_string(), "2024-09-02 08:15:30");
    }

    #[test]
    fn test_parse_blank_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[derive(serde::Deserialize)]
    struct Event {
        #[serde(default, with = "timestamp")]
        time: NaiveDateTime,
        #[serde(default, with = "optional_timestamp")]
        last: Option<NaiveDateTime>,
    }

    #[test]
    fn test_odd_stored_values_do_not_fail() {
        let event: Event = serde_json::from_str(r#"{"time": null, "last": 17}"#).unwrap();
        assert_eq!(event.time, NaiveDateTime::default());
        assert_eq!(event.last, None);

        let event: Event = serde_json::from_str(r#"{"time": "last tuesday", "last": "2024-09-02 08:15:30"}"#).unwrap();
        assert_eq!(event.time, NaiveDateTime::default());
        assert_eq!(event.last, Some(sample()));
    }

    #[test]
    fn test_now_has_whole_seconds() {
        let ts = now();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)), Some(ts));
    }
}
