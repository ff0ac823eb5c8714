use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing short uppercase timezone abbreviation ("EST", "PDT", "GMT", ...)
static TRAILING_TZ_ABBREV: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,4}$").expect("trailing-tz regex"));

/// RFC-822-style date: optional weekday, day, month name, year,
/// hour:minute(:second)?, optional numeric UTC offset.
static RFC822_PARTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\w+,\s*)?(\d{1,2})\s+(\w+)\s+(\d{4})\s+(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([+-]\d{4})?",
    )
    .expect("rfc822 regex")
});

const MONTH_ABBREVS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Convert an arbitrary publication-date string into a UTC instant.
///
/// This is a total function: feeds emit dates in inconsistent, sometimes
/// malformed formats, and the contract is "always produce a timestamp".
/// Attempts, in order, first success wins:
///
/// 1. blank input → now
/// 2. direct parse of the raw string
/// 3. strip a trailing timezone abbreviation, then a structured
///    RFC-822-style match rebuilt as canonical RFC 3339
/// 4. direct parse of the cleaned string
/// 5. warn and fall back to now
pub fn normalize_pub_date(raw: &str) -> DateTime<Utc> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Utc::now();
    }

    if let Some(instant) = parse_generic(trimmed) {
        return instant;
    }

    let cleaned = TRAILING_TZ_ABBREV.replace(trimmed, "");
    let cleaned = cleaned.trim();

    if let Some(instant) = parse_rfc822_like(cleaned) {
        return instant;
    }
    if let Some(instant) = parse_generic(cleaned) {
        return instant;
    }

    tracing::warn!(date = %raw, "Unparseable publication date, using current time");
    Utc::now()
}

/// Direct parse attempts: the well-known formats first, then a few common
/// naive shapes assumed to be UTC.
fn parse_generic(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc2822(s) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Structured fallback for RFC-822-ish dates the strict parsers reject
/// (spelled-out weekdays or months, single-digit fields, missing seconds).
/// Rebuilds the pieces as a canonical RFC 3339 string and parses that, so
/// chrono still validates the calendar date.
fn parse_rfc822_like(s: &str) -> Option<DateTime<Utc>> {
    let caps = RFC822_PARTS.captures(s)?;

    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year = &caps[3];
    let hour: u32 = caps[4].parse().ok()?;
    let minute = &caps[5];
    let second: u32 = caps.get(6).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let offset = match caps.get(7) {
        // "+0530" → "+05:30", the RFC 3339 spelling
        Some(m) => format!("{}:{}", &m.as_str()[..3], &m.as_str()[3..]),
        None => "Z".to_string(),
    };

    let canonical = format!(
        "{year}-{month:02}-{day:02}T{hour:02}:{minute}:{second:02}{offset}"
    );
    DateTime::parse_from_rfc3339(&canonical)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}

/// Resolve a month name to its 1-12 index by case-insensitive prefix match
/// against the twelve standard abbreviations ("January" and "Jan" both → 1).
fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    MONTH_ABBREVS
        .iter()
        .position(|abbrev| lower.starts_with(abbrev))
        .map(|index| index as u32 + 1)
}
