//! Tolerant field decoders for form submissions.
//!
//! The browser form posts empty strings for untouched inputs, numbers as strings, and yes/no
//! radio buttons as `"YES"`/`"NO"`. These helpers are used with `#[serde(default,
//! deserialize_with = "...")]` so the request structs can stay typed.
//!
//! The `nullable_*` variants are for PATCH bodies: a missing field deserialises to `None`
//! (keep the stored value) via `#[serde(default)]`, while an explicit `null` or blank string
//! becomes `Some(None)` (clear the stored value).

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Typed value; null and blank strings are absent.
pub(crate) fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value) if !is_blank(&value) => T::deserialize(value).map(Some).map_err(D::Error::custom),
        _ => Ok(None),
    }
}

pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    optional(deserializer).map(Some)
}

/// Free text. Numbers and booleans are stringified rather than rejected.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value) if is_blank(&value) => Ok(None),
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected text, got {other}"))),
    }
}

pub(crate) fn nullable_text<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    text(deserializer).map(Some)
}

/// Numbers, or strings holding a number.
pub(crate) fn number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + FromStr,
    T::Err: Display,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value) if is_blank(&value) => Ok(None),
        None => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<T>()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid number '{trimmed}': {e}")))
        }
        Some(value) => T::deserialize(value).map(Some).map_err(D::Error::custom),
    }
}

pub(crate) fn nullable_number<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + FromStr,
    T::Err: Display,
{
    number(deserializer).map(Some)
}

/// Booleans, or the form's `"YES"`/`"NO"` (and `"true"`/`"false"`) strings.
pub(crate) fn yes_no<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value) if is_blank(&value) => Ok(None),
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) => match s.trim().to_ascii_uppercase().as_str() {
            "YES" | "TRUE" => Ok(Some(true)),
            "NO" | "FALSE" => Ok(Some(false)),
            other => Err(D::Error::custom(format!("expected YES or NO, got '{other}'"))),
        },
        Some(other) => Err(D::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

/// Lists of codes or free text. Blank items are dropped.
pub(crate) fn list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        )),
        Some(other) => Err(D::Error::custom(format!("expected a list, got {other}"))),
    }
}

/// Parse an assessment date: RFC 3339, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_assessment_date(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

pub(crate) fn date_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match text(deserializer)? {
        None => Ok(None),
        Some(s) => parse_assessment_date(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date '{s}'"))),
    }
}
