//! Date normalization.
//!
//! Every stage maps free-form date text to a UTC instant through
//! [`normalize`]. Text that matches no known format becomes [`SENTINEL`]
//! (`1970-01-01T00:00:00Z`), so a record is never dropped because of its date;
//! it sorts last and falls outside any recency window.
//!
//! Canonical serialization is RFC 3339 with a `Z` suffix, which [`normalize`]
//! parses back unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Stand-in for an unknown or unparseable publish date.
pub const SENTINEL: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Date-only formats understood by every stage that does not know the source.
pub const ALL_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y.", "%b %d, %Y", "%B %d, %Y", "%Y/%m/%d"];

/// Offset-bearing formats tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

/// Naive date-time formats, read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse `text` as a timestamp, trying ISO-8601 shapes first and then the
/// given date-only `formats` in order.
pub fn parse_date(text: &str, formats: &[&str]) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // `Z` and explicit offsets both land here.
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

/// [`parse_date`], with [`SENTINEL`] for anything unparseable.
pub fn normalize(text: &str, formats: &[&str]) -> DateTime<Utc> {
    parse_date(text, formats).unwrap_or(SENTINEL)
}

pub fn is_sentinel(dt: &DateTime<Utc>) -> bool {
    *dt == SENTINEL
}

/// Canonical text form, e.g. `2024-10-10T00:00:00Z`.
pub fn to_canonical(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Short `YYYY-MM-DD` form, or [`crate::models::NO_DATE`] for the sentinel.
pub fn display_date(dt: &DateTime<Utc>) -> String {
    if is_sentinel(dt) {
        crate::models::NO_DATE.to_string()
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

/// Serde adapter writing canonical text and reading leniently through
/// [`normalize`], so a hand-edited or foreign dataset never fails to load on
/// a bad date.
pub mod canonical {
    use super::{ALL_FORMATS, normalize, to_canonical};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_canonical(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(normalize(&raw, ALL_FORMATS))
    }
}
