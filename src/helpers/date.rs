//! Date helper functions

use chrono::{DateTime, Datelike, FixedOffset, TimeZone};

use crate::i18n::I18n;

/// A piece of a Moment.js-style format string
#[derive(Clone, Copy)]
enum Token {
    Chrono(&'static str),
    MonthShort,
    MonthLong,
}

/// Recognised tokens, longest first within each family
const TOKENS: &[(&str, Token)] = &[
    // Year
    ("YYYY", Token::Chrono("%Y")),
    ("YY", Token::Chrono("%y")),
    // Month
    ("MMMM", Token::MonthLong),
    ("MMM", Token::MonthShort),
    ("MM", Token::Chrono("%m")),
    // Day of year / month
    ("DDDD", Token::Chrono("%j")),
    ("DD", Token::Chrono("%d")),
    ("D", Token::Chrono("%-d")),
    // Day of week
    ("dddd", Token::Chrono("%A")),
    ("ddd", Token::Chrono("%a")),
    // Time
    ("HH", Token::Chrono("%H")),
    ("hh", Token::Chrono("%I")),
    ("mm", Token::Chrono("%M")),
    ("ss", Token::Chrono("%S")),
    ("SSS", Token::Chrono("%3f")),
    ("ZZ", Token::Chrono("%z")),
];

/// Format a date using a Moment.js-compatible format string, with month
/// names taken from the current language.
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", &i18n) // -> "15 Mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, i18n: &I18n) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;

    'outer: while !rest.is_empty() {
        for (pattern, token) in TOKENS {
            if let Some(tail) = rest.strip_prefix(pattern) {
                match token {
                    Token::Chrono(spec) => out.push_str(&date.format(spec).to_string()),
                    Token::MonthShort => out.push_str(&i18n.month_short(date.month())),
                    Token::MonthLong => out.push_str(&i18n.month_long(date.month())),
                }
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Parse a CMS timestamp.
///
/// Accepts RFC 3339 (`2021-03-15T19:25:28Z`, `...+00:00`) and the colon-less
/// offset the CMS emits (`2021-03-15T19:25:28+0000`).
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// A publication date ready for display
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DisplayDate {
    /// Machine-readable value for `<time datetime>`
    pub datetime: String,
    /// Human-readable value
    pub text: String,
}

/// Format an optional CMS timestamp in the given timezone.
///
/// Absent or unparseable values yield `None`; callers render no date.
pub fn display_date<Tz: TimeZone>(
    value: Option<&str>,
    format: &str,
    tz: &Tz,
    i18n: &I18n,
) -> Option<DisplayDate>
where
    Tz::Offset: std::fmt::Display,
{
    let raw = value?;
    let Some(parsed) = parse_timestamp(raw) else {
        tracing::warn!("Ignoring unparseable publication date {:?}", raw);
        return None;
    };
    let local = parsed.with_timezone(tz);
    Some(DisplayDate {
        datetime: date_xml(&local),
        text: format_date(&local, format, i18n),
    })
}
