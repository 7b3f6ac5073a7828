//! Publish date normalization.
//!
//! RSS feeds in the wild use many date layouts. Each accepted layout is tried
//! in a fixed order and the first match is rendered as RFC3339.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};

use crate::{GatorError, Result};

/// Normalized, unambiguous publish time as stored on a post.
///
/// Either empty (the item carried no date) or an RFC3339 string with second
/// precision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalTimestamp(String);

impl CanonicalTimestamp {
    /// The value used for items without a date.
    pub fn empty() -> Self {
        Self(String::new())
    }

    fn from_datetime(dt: &DateTime<FixedOffset>) -> Self {
        Self(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// Borrow the canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An accepted date layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `Mon, 02 Jan 2006 15:04:05 GMT`
    ///
    /// Kept for layout order only: [`DateFormat::Rfc1123`] already reads `GMT`
    /// as UTC, so `detect` never returns this variant.
    Rfc1123Gmt,
    /// `2006-01-02 15:04:05`, read as UTC
    SqlDateTime,
    /// `2006-01-02`, midnight UTC
    IsoDate,
    /// `02 Jan 2006 15:04:05 MST`
    DayMonthYearTime,
    /// `02 Jan 2006`, midnight UTC
    DayMonthYear,
}

/// Accepted layouts in priority order.
pub const DATE_FORMATS: [DateFormat; 8] = [
    DateFormat::Rfc3339,
    DateFormat::Rfc1123,
    DateFormat::Rfc1123Z,
    DateFormat::Rfc1123Gmt,
    DateFormat::SqlDateTime,
    DateFormat::IsoDate,
    DateFormat::DayMonthYearTime,
    DateFormat::DayMonthYear,
];

impl DateFormat {
    /// Try to parse `input` with this layout.
    pub fn parse(self, input: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            DateFormat::Rfc3339 => DateTime::parse_from_rfc3339(input).ok(),
            DateFormat::Rfc1123 => parse_with_zone_name(strip_weekday(input)?),
            DateFormat::Rfc1123Z => {
                DateTime::parse_from_str(strip_weekday(input)?, "%d %b %Y %H:%M:%S %z").ok()
            }
            DateFormat::Rfc1123Gmt => {
                let rest = strip_weekday(input)?.strip_suffix(" GMT")?;
                let naive = NaiveDateTime::parse_from_str(rest, "%d %b %Y %H:%M:%S").ok()?;
                Some(naive.and_utc().fixed_offset())
            }
            DateFormat::SqlDateTime => {
                let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S").ok()?;
                Some(naive.and_utc().fixed_offset())
            }
            DateFormat::IsoDate => midnight_utc(NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?),
            DateFormat::DayMonthYearTime => parse_with_zone_name(input),
            DateFormat::DayMonthYear => midnight_utc(NaiveDate::parse_from_str(input, "%d %b %Y").ok()?),
        }
    }
}

/// Normalize a raw publish date into its canonical form.
///
/// Empty (or all-whitespace) input yields the empty value.
pub fn normalize(raw: &str) -> Result<CanonicalTimestamp> {
    let input = raw.trim();
    if input.is_empty() {
        return Ok(CanonicalTimestamp::empty());
    }

    match detect(input) {
        Some((_, dt)) => Ok(CanonicalTimestamp::from_datetime(&dt)),
        None => Err(GatorError::DateParse(raw.to_string())),
    }
}

/// Find the first layout that parses `input`.
pub fn detect(input: &str) -> Option<(DateFormat, DateTime<FixedOffset>)> {
    DATE_FORMATS
        .iter()
        .find_map(|format| format.parse(input).map(|dt| (*format, dt)))
}

/// Drop a leading `Mon, ` day name. The day is not checked against the date.
fn strip_weekday(input: &str) -> Option<&str> {
    let (day, rest) = input.split_once(',')?;
    if day.len() < 3 || !day.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(rest.trim_start())
}

/// Parse `02 Jan 2006 15:04:05 MST`.
fn parse_with_zone_name(input: &str) -> Option<DateTime<FixedOffset>> {
    let (datetime, zone) = input.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(datetime, "%d %b %Y %H:%M:%S").ok()?;
    offset.from_local_datetime(&naive).single()
}

/// Offset for a zone abbreviation.
///
/// The North American names from RFC 822 map to their real offsets. Any other
/// alphabetic abbreviation is accepted as UTC, since it cannot be resolved
/// without a zone database.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || zone.len() > 5 || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<FixedOffset>> {
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset())
}
