//! Tolerant parsing of mail `Date` headers

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Timezone-less layouts tried last; the value is taken as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Outcome of parsing a date header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    /// Parsed and converted to UTC
    Valid(DateTime<Utc>),
    /// No date header, or only whitespace
    Missing,
    /// Present but no known layout matched
    Unparseable,
}

impl ParsedDate {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ParsedDate::Valid(dt) => Some(*dt),
            ParsedDate::Missing | ParsedDate::Unparseable => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedDate::Valid(_))
    }
}

/// Parse a raw `Date` header value
///
/// RFC 2822 is tried first, then the same string without its day-of-week,
/// then RFC 3339, then a handful of layouts with no timezone.
pub fn parse_date(raw: Option<&str>) -> ParsedDate {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return ParsedDate::Missing,
    };

    let cleaned = strip_trailing_comment(&collapse_whitespace(raw));

    if let Ok(dt) = DateTime::parse_from_rfc2822(&cleaned) {
        return ParsedDate::Valid(dt.with_timezone(&Utc));
    }

    let without_day = strip_day_name(&cleaned);
    if without_day != cleaned {
        if let Ok(dt) = DateTime::parse_from_rfc2822(without_day) {
            return ParsedDate::Valid(dt.with_timezone(&Utc));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return ParsedDate::Valid(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(without_day, format) {
            return ParsedDate::Valid(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(without_day, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return ParsedDate::Valid(naive.and_utc());
        }
    }

    ParsedDate::Unparseable
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `Mon, 1 Jan 2024 10:00:00 +0000 (UTC)` -> `Mon, 1 Jan 2024 10:00:00 +0000`
fn strip_trailing_comment(value: &str) -> String {
    if value.ends_with(')') {
        if let Some(pos) = value.rfind(" (") {
            return value[..pos].trim_end().to_string();
        }
    }
    value.to_string()
}

/// Drop a leading `Word,` regardless of how the day is spelled
fn strip_day_name(value: &str) -> &str {
    match value.split_once(',') {
        Some((day, rest)) if !day.is_empty() && day.chars().all(char::is_alphabetic) => {
            rest.trim_start()
        }
        _ => value,
    }
}
