//! Decoding and normalization of extraction responses.
//!
//! The model's reply is decoded into `RawTaskDetails`, where every field is
//! optional and wrongly typed values decode as absent. `normalize` then
//! applies per-field defaults, so a well-formed JSON object always yields a
//! complete `TaskDetails`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::ExtractError;
use super::prompt::MAX_CATEGORIES;
use super::TaskDetails;
use crate::task::{dedup_labels, Priority};

/// Hour of day assigned to date-only due dates.
pub const DATE_ONLY_HOUR: u32 = 12;

/// Shift applied to due dates that are not in the future.
pub const PAST_DATE_SHIFT_DAYS: i64 = 365;

/// Extraction reply as sent by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTaskDetails {
    #[serde(default, deserialize_with = "lenient_string")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub categories: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub clean_title: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(s)) => Some(vec![s]),
        _ => None,
    })
}

/// Locate and decode the JSON object in a model reply.
///
/// Tolerates surrounding prose and markdown code fences by taking the span
/// from the first `{` to the last `}`.
pub fn decode_response(text: &str) -> Result<RawTaskDetails, ExtractError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::EmptyResponse);
    }

    let start = trimmed
        .find('{')
        .ok_or_else(|| ExtractError::malformed("no JSON object in response"))?;
    let end = trimmed
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ExtractError::malformed("unterminated JSON object in response"))?;

    serde_json::from_str(&trimmed[start..=end]).map_err(|e| ExtractError::malformed(e.to_string()))
}

/// ISO-8601 date-time layouts accepted without an offset, read as UTC.
const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_naive_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .unwrap_or(raw);
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a due date and move it into the future.
///
/// Accepts an RFC 3339 date-time, an ISO-8601 date-time without offset or
/// seconds (read as UTC), or a plain `YYYY-MM-DD` date pinned to noon UTC so
/// timezone shifts cannot move it to a neighbouring day. A result at or
/// before `now` is pushed forward by exactly 365 days. Returns `None` when
/// nothing parses.
pub fn normalize_due_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_naive_datetime(raw))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(DATE_ONLY_HOUR, 0, 0))
                .map(|naive| naive.and_utc())
        })?;

    if parsed > now {
        Some(parsed)
    } else {
        Some(parsed + Duration::days(PAST_DATE_SHIFT_DAYS))
    }
}

/// Apply per-field defaults to a decoded reply.
pub fn normalize(
    raw: RawTaskDetails,
    original_text: &str,
    default_duration: &str,
    now: DateTime<Utc>,
) -> TaskDetails {
    let due_date = raw.due_date.as_deref().and_then(|d| {
        let normalized = normalize_due_date(d, now);
        if normalized.is_none() {
            tracing::debug!("Ignoring unparseable due date {:?}", d);
        }
        normalized
    });

    let priority = raw
        .priority
        .as_deref()
        .and_then(|p| p.parse::<Priority>().ok())
        .unwrap_or(Priority::LOWEST);

    let duration = raw
        .duration
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| default_duration.to_string());

    let mut categories = dedup_labels(raw.categories.unwrap_or_default());
    categories.truncate(MAX_CATEGORIES);

    let title = raw
        .clean_title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| original_text.trim().to_string());

    TaskDetails {
        title,
        due_date,
        priority: Some(priority),
        duration,
        categories,
    }
}
