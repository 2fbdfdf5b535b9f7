// 📅 Date parsing - tolerant readers for stored date/time text
//
// Appointment, billing and patient dates arrive as text from the store.
// Everything time-dependent in the analytics core goes through here so a
// malformed value is a typed error instead of a panic.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DateParseError {
    #[error("date is empty")]
    Empty,
    #[error("unrecognised date/time format: {0}")]
    InvalidFormat(String),
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a date-time, keeping the offset it was written with.
///
/// The wall-clock fields (weekday, hour) of the result are the local ones of
/// that offset. Text without an offset is taken as UTC, and a bare
/// `YYYY-MM-DD` means midnight UTC.
pub fn parse_date_time(text: &str) -> Result<DateTime<FixedOffset>, DateParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DateParseError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }

    let utc = Utc.fix();

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(utc.from_utc_datetime(&midnight));
        }
    }

    Err(DateParseError::InvalidFormat(text.to_string()))
}

/// Parse a date-time and normalise it to UTC.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, DateParseError> {
    parse_date_time(text).map(|dt| dt.with_timezone(&Utc))
}

/// Parse a calendar date of birth.
///
/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY`, or any date-time form understood by
/// [`parse_date_time`] (the date part is kept).
pub fn parse_birth_date(text: &str) -> Result<NaiveDate, DateParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DateParseError::Empty);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
        return Ok(date);
    }

    parse_date_time(text).map(|dt| dt.date_naive())
}
