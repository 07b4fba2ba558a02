//! Input validation for tool arguments, accession numbers and URLs.
//!
//! Everything here runs before any network or filesystem work. Values outside
//! their allowed range are rejected with a specific reason and are never clamped.

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use thiserror::Error;

/// Maximum query length in characters
pub const MAX_QUERY_LEN: usize = 500;
/// Minimum query length in characters (after trimming)
pub const MIN_QUERY_LEN: usize = 2;
/// Allowed number of result pages per search
pub const MAX_PAGES_RANGE: RangeInclusive<i64> = 1..=10;
/// Allowed number of merged results per search
pub const TOP_N_RANGE: RangeInclusive<i64> = 1..=50;
/// Allowed extraction bound for `summarize_pdf`
pub const MAX_CHARS_RANGE: RangeInclusive<i64> = 100..=10_000;
/// Allowed look-back window for "added in the last N days"
pub const DAYS_BACK_RANGE: RangeInclusive<i64> = 1..=3650;
/// Maximum accession numbers in one batch download
pub const MAX_BATCH_SIZE: usize = 50;

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Query must be at least {} characters", MIN_QUERY_LEN)]
    QueryTooShort,

    #[error("Query is too long ({0} characters, max {max})", max = MAX_QUERY_LEN)]
    QueryTooLong(usize),

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Invalid accession number '{value}': {reason}")]
    InvalidAccession { value: String, reason: &'static str },

    #[error("Invalid date for {field}: '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("date_from ({from}) is after date_to ({to})")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many items requested ({count}, max {max})")]
    TooManyItems { count: usize, max: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Validate a search query and return it trimmed.
pub fn validate_query(query: &str) -> Result<String, ValidationError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }

    let len = trimmed.chars().count();
    if len < MIN_QUERY_LEN {
        return Err(ValidationError::QueryTooShort);
    }
    if len > MAX_QUERY_LEN {
        return Err(ValidationError::QueryTooLong(len));
    }

    Ok(trimmed.to_string())
}

/// Check that `value` lies within `range`.
pub fn check_range(
    field: &'static str,
    value: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, ValidationError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Validate an ADAMS accession number and return its normalized (upper-case) form.
///
/// Accession numbers start with `ML`, are at least 8 characters long and contain
/// only ASCII letters and digits (e.g. `ML12345A678`).
pub fn validate_accession_number(value: &str) -> Result<String, ValidationError> {
    let invalid = |reason| ValidationError::InvalidAccession {
        value: value.to_string(),
        reason,
    };

    let normalized = value.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(invalid("cannot be empty"));
    }
    if !normalized.starts_with("ML") {
        return Err(invalid("must start with 'ML'"));
    }
    if normalized.len() < 8 {
        return Err(invalid("too short"));
    }
    if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("contains invalid characters"));
    }

    Ok(normalized)
}

/// Parse a `YYYY-MM-DD` date argument.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Validate a download URL taken from a search response.
///
/// Only `http` and `https` URLs without embedded control characters are accepted.
pub fn validate_url(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::InvalidUrl("empty URL".to_string()));
    }

    if url.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidUrl(
            "contains control characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(ValidationError::InvalidUrl(format!(
            "invalid scheme: {}",
            other
        ))),
    }
}
