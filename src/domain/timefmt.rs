//! Serde helpers for the `"YYYY-MM-DD HH:MM"` / `"HH:MM"` wire formats
//!
//! Trip profiles and schedule items carry localized minute-precision times.
//! These modules plug into `#[serde(with = ...)]` on `chrono` fields.

use chrono::{NaiveDateTime, NaiveTime};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const TIME_FORMAT: &str = "%H:%M";

pub mod datetime {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::*;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT).map_err(D::Error::custom)
    }
}

pub mod time {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::*;

    pub fn serialize<S: Serializer>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).map_err(D::Error::custom)
    }
}
