// src/models/time.rs

//! Timestamp formats used by the listing and the ledger.
//!
//! Listing timestamps keep the directory page's own textual form
//! (`01/03/2025 08:30 AM`) so ledger comparisons stay exact. Run timestamps
//! are UTC with second precision.

use chrono::{NaiveDateTime, SubsecRound, Utc};

/// Format of `file_timestamp` as shown in the directory listing.
pub const LISTING_FORMAT: &str = "%m/%d/%Y %I:%M %p";

/// Format of `start_timestamp` / `end_timestamp`.
pub const RUN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a listing timestamp such as `1/3/2025 8:30 AM`.
pub fn parse_listing(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, LISTING_FORMAT)
}

/// Current run time, truncated to whole seconds.
pub fn run_timestamp_now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

pub(crate) mod listing_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::{LISTING_FORMAT, parse_listing};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&value.format(LISTING_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_listing(&raw).map_err(|e| de::Error::custom(format!("'{raw}': {e}")))
    }
}

pub(crate) mod run_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::RUN_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&value.format(RUN_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(raw.trim(), RUN_FORMAT)
            .map_err(|e| de::Error::custom(format!("'{raw}': {e}")))
    }
}

/// Optional run timestamp; `None` is an empty cell.
pub(crate) mod optional_run_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::RUN_FORMAT;

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => s.collect_str(&value.format(RUN_FORMAT)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDateTime::parse_from_str(raw, RUN_FORMAT)
            .map(Some)
            .map_err(|e| de::Error::custom(format!("'{raw}': {e}")))
    }
}

/// `true`/`false` stored as `Y`/`N`.
pub(crate) mod active_flag {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *value { "Y" } else { "N" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(d)?;
        match raw.trim() {
            "Y" | "y" => Ok(true),
            "N" | "n" => Ok(false),
            other => Err(de::Error::custom(format!(
                "is_active must be Y or N, got '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_accepts_unpadded_fields() {
        let parsed = parse_listing("1/3/2025  8:30 AM").unwrap();
        assert_eq!(
            parsed.format(LISTING_FORMAT).to_string(),
            "01/03/2025 08:30 AM"
        );
    }

    #[test]
    fn test_parse_listing_pm() {
        let parsed = parse_listing("12/31/2024 11:05 PM").unwrap();
        assert_eq!(parsed.format(RUN_FORMAT).to_string(), "2024-12-31 23:05:00");
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        assert!(parse_listing("yesterday").is_err());
    }

    #[test]
    fn test_run_timestamp_has_no_subseconds() {
        use chrono::Timelike;
        assert_eq!(run_timestamp_now().nanosecond(), 0);
    }
}
