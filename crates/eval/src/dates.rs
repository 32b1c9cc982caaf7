//! RFC 3339 timestamps for serde fields.

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::types::ValueError;

pub fn parse_datetime(text: &str) -> Result<OffsetDateTime, ValueError> {
    OffsetDateTime::parse(text.trim(), &Rfc3339).map_err(|_| ValueError::Conversion {
        value: format!("\"{}\"", text),
        target: "datetime",
    })
}

pub fn format_datetime(dt: &OffsetDateTime) -> String {
    crate::types::values::render_datetime(dt)
}

/// `#[serde(with = "crate::dates::rfc3339")]`
pub mod rfc3339 {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_datetime(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
        let text = String::deserialize(d)?;
        parse_datetime(&text).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "crate::dates::rfc3339_option")]`
pub mod rfc3339_option {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &Option<OffsetDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_str(&format_datetime(dt)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(text) => parse_datetime(&text)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
