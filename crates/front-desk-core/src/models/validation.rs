//! Normalization and validation of caller-supplied fields.

use chrono::{NaiveDate, NaiveTime, Timelike};
use thiserror::Error;

/// A required field is missing or malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Shortest and longest digit count accepted for a phone number (E.164 caps at 15).
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 6..=15;

/// Normalize a phone number into the canonical key form.
///
/// Separators (spaces, dashes, dots, slashes, parentheses) are dropped, a
/// leading `+` is kept and a leading `00` international prefix becomes `+`.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("phone", "phone number is required"));
    }

    let mut international = false;
    let mut digits = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        match c {
            '+' if i == 0 => international = true,
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '/' | '(' | ')' => {}
            other => {
                return Err(ValidationError::new(
                    "phone",
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    if !international && digits.starts_with("00") {
        digits.drain(..2);
        international = true;
    }

    if !PHONE_DIGITS.contains(&digits.len()) {
        return Err(ValidationError::new(
            "phone",
            format!(
                "expected {} to {} digits, got {}",
                PHONE_DIGITS.start(),
                PHONE_DIGITS.end(),
                digits.len()
            ),
        ));
    }

    Ok(if international {
        format!("+{}", digits)
    } else {
        digits
    })
}

/// Trim a required text field, rejecting blank input.
pub fn require_text(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank becomes `None`.
pub fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse an ISO calendar date (`YYYY-MM-DD`).
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("date", "date is required"));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| ValidationError::new("date", format!("'{}' is not a YYYY-MM-DD date", trimmed)))
}

/// Parse a time of day (`HH:MM` or `HH:MM:SS`), truncated to the minute.
pub fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("time", "time is required"));
    }
    let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ValidationError::new("time", format!("'{}' is not an HH:MM time", trimmed)))?;
    Ok(truncate_to_minute(time))
}

pub(crate) fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Serde adapter storing times of day as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}
