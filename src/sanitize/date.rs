//! Date recognition.
//!
//! Patterns are tried from most to least specific. Numeric dates with an
//! ambiguous first component default to month-first; a first component above
//! 12 forces day-first. Every candidate is validated against the real calendar
//! before it is accepted, so `02/29/2023` is rejected while `02/29/2024` is not.

use std::sync::LazyLock;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use regex::{Captures, Regex};

use super::{SanitizeResult, WarningType};
use crate::data::{CellValue, format_iso, timestamp_to_datetime};

static ISO_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:T(\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .expect("valid ISO date pattern")
});

static YEAR_FIRST_SLASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").expect("valid year-first pattern")
});

static MONTH_NAME_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z]+,\s*)?(?P<month>[a-z]{3,})\.?\s+(?P<day>\d{1,2})(?:st|nd|rd|th)?,?\s+(?P<year>\d{4})(?:,?\s+(?:at\s+)?(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?\s*(?P<meridiem>[ap]\.?m\.?)?)?$",
    )
    .expect("valid month-name pattern")
});

static DAY_FIRST_MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<day>\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?(?P<month>[a-z]{3,})\.?,?\s+(?P<year>\d{4})(?:,?\s+(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?\s*(?P<meridiem>[ap]\.?m\.?)?)?$",
    )
    .expect("valid day-first month-name pattern")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{1,2})[/-](\d{1,2})[/-](\d{4})(?:[ T]+(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([ap]\.?m\.?)?)?$",
    )
    .expect("valid numeric date pattern")
});

static SPACED_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})\s+(\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?$")
        .expect("valid spaced datetime pattern")
});

static COMPACT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid compact date pattern"));

static FOUR_DIGIT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)\d{4}(?:\D|$)").expect("valid year pattern"));

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%Y-%b-%d",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
];

/// A recognised instant. `utc` is set when the input carried a zone
/// designator and the value has been shifted to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParsedDate {
    value: NaiveDateTime,
    utc: bool,
}

impl ParsedDate {
    fn local(value: NaiveDateTime) -> Self {
        Self { value, utc: false }
    }

    fn to_iso(self) -> String {
        if self.utc {
            self.value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
        } else {
            format_iso(self.value)
        }
    }
}

pub fn sanitize_date(value: &CellValue) -> SanitizeResult<String> {
    match value {
        CellValue::Empty => SanitizeResult::empty(),
        CellValue::Timestamp(millis) => match timestamp_to_datetime(*millis) {
            Some(datetime) => SanitizeResult::clean(format_iso(datetime)),
            None => SanitizeResult::warned(
                None,
                WarningType::DateParsing,
                "Date value does not hold a valid timestamp",
            ),
        },
        other => {
            let text = other.as_display();
            let text = text.trim();
            if text.is_empty() {
                return SanitizeResult::empty();
            }
            match parse_date_text(text) {
                Some(iso) => SanitizeResult::clean(iso),
                None => SanitizeResult::warned(
                    None,
                    WarningType::DateParsing,
                    format!("Could not parse '{text}' as a date"),
                ),
            }
        }
    }
}

/// Parses free-form date text into an ISO 8601 string.
pub fn parse_date_text(text: &str) -> Option<String> {
    let text = text.trim();
    parse_iso(text)
        .or_else(|| parse_year_first_slash(text))
        .or_else(|| parse_month_name(text))
        .or_else(|| parse_numeric(text))
        .or_else(|| parse_spaced_datetime(text))
        .or_else(|| parse_fallback(text))
        .map(ParsedDate::to_iso)
}

fn parse_iso(text: &str) -> Option<ParsedDate> {
    let caps = ISO_DATETIME.captures(text)?;
    let date = ymd(number(&caps, 1)?, number(&caps, 2)?, number(&caps, 3)?)?;
    let Some(hour) = caps.get(4) else {
        return Some(ParsedDate::local(date.and_time(NaiveTime::MIN)));
    };
    let time = hms(
        hour.as_str().parse().ok()?,
        number(&caps, 5)?,
        number(&caps, 6).unwrap_or(0),
    )?;
    let naive = date.and_time(time);
    match caps.get(7).map(|m| m.as_str()) {
        None => Some(ParsedDate::local(naive)),
        Some("Z") => Some(ParsedDate {
            value: naive,
            utc: true,
        }),
        Some(offset) => {
            let offset = parse_offset(offset)?;
            let shifted = offset.from_local_datetime(&naive).single()?;
            Some(ParsedDate {
                value: shifted.naive_utc(),
                utc: true,
            })
        }
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let sign = if raw.starts_with('-') { -1 } else { 1 };
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_year_first_slash(text: &str) -> Option<ParsedDate> {
    let caps = YEAR_FIRST_SLASH.captures(text)?;
    let date = ymd(number(&caps, 1)?, number(&caps, 2)?, number(&caps, 3)?)?;
    Some(ParsedDate::local(date.and_time(NaiveTime::MIN)))
}

fn parse_month_name(text: &str) -> Option<ParsedDate> {
    let caps = MONTH_NAME_FIRST
        .captures(text)
        .or_else(|| DAY_FIRST_MONTH_NAME.captures(text))?;
    let month = month_from_name(caps.name("month")?.as_str())?;
    let day = caps.name("day")?.as_str().parse().ok()?;
    let year = caps.name("year")?.as_str().parse().ok()?;
    let date = ymd(year, month, day)?;
    let time = match caps.name("hour") {
        Some(hour) => clock_time(
            hour.as_str().parse().ok()?,
            caps.name("minute")?.as_str().parse().ok()?,
            caps.name("second")
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0),
            caps.name("meridiem").map(|m| m.as_str()),
        )?,
        None => NaiveTime::MIN,
    };
    Some(ParsedDate::local(date.and_time(time)))
}

fn parse_numeric(text: &str) -> Option<ParsedDate> {
    let caps = NUMERIC_DATE.captures(text)?;
    let first = number(&caps, 1)?;
    let second = number(&caps, 2)?;
    let year = number(&caps, 3)?;
    let (month, day) = if first > 12 {
        (second, first)
    } else {
        (first, second)
    };
    let date = ymd(year, month, day)?;
    let time = match caps.get(4) {
        Some(hour) => clock_time(
            hour.as_str().parse().ok()?,
            number(&caps, 5)?,
            number(&caps, 6).unwrap_or(0),
            caps.get(7).map(|m| m.as_str()),
        )?,
        None => NaiveTime::MIN,
    };
    Some(ParsedDate::local(date.and_time(time)))
}

fn parse_spaced_datetime(text: &str) -> Option<ParsedDate> {
    let caps = SPACED_DATETIME.captures(text)?;
    let date = ymd(number(&caps, 1)?, number(&caps, 2)?, number(&caps, 3)?)?;
    let time = hms(number(&caps, 4)?, number(&caps, 5)?, number(&caps, 6).unwrap_or(0))?;
    Some(ParsedDate::local(date.and_time(time)))
}

/// Last resort for the long tail of formats. Only considered when a
/// four-digit year is present so bare numbers never become dates.
fn parse_fallback(text: &str) -> Option<ParsedDate> {
    if let Some(caps) = COMPACT_DATE.captures(text) {
        let date = ymd(number(&caps, 1)?, number(&caps, 2)?, number(&caps, 3)?)?;
        return Some(ParsedDate::local(date.and_time(NaiveTime::MIN)));
    }
    if !FOUR_DIGIT_YEAR.is_match(text) {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text).or_else(|_| DateTime::parse_from_rfc2822(text)) {
        return Some(ParsedDate {
            value: parsed.with_timezone(&Utc).naive_utc(),
            utc: true,
        });
    }
    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
        .or_else(|| {
            FALLBACK_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        })
        .map(ParsedDate::local)
}

fn number(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn ymd(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

fn hms(hour: u32, minute: u32, second: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// 12-hour clock when a meridiem is present, 24-hour otherwise.
fn clock_time(hour: u32, minute: u32, second: u32, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hour = match meridiem.map(|m| m.to_ascii_lowercase()) {
        None => hour,
        Some(_) if !(1..=12).contains(&hour) => return None,
        Some(m) if m.starts_with('p') => hour % 12 + 12,
        Some(_) => hour % 12,
    };
    hms(hour, minute, second)
}

/// Full names and unambiguous prefixes of at least three letters.
fn month_from_name(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|month| month.starts_with(&name))
        .and_then(|index| u32::try_from(index + 1).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<String> {
        parse_date_text(text)
    }

    #[test]
    fn month_first_numeric_date_is_default() {
        let result = sanitize_date(&CellValue::text("01/15/2024"));
        assert_eq!(result, SanitizeResult::clean("2024-01-15".to_string()));
        assert_eq!(parse("03/04/2024").as_deref(), Some("2024-03-04"));
    }

    #[test]
    fn first_component_above_twelve_forces_day_first() {
        assert_eq!(parse("15/01/2024").as_deref(), Some("2024-01-15"));
        assert_eq!(parse("31-12-2024").as_deref(), Some("2024-12-31"));
        assert_eq!(parse("13/13/2024"), None);
    }

    #[test]
    fn iso_forms() {
        assert_eq!(parse("2024-01-15").as_deref(), Some("2024-01-15"));
        assert_eq!(parse("2024-01-15T09:30").as_deref(), Some("2024-01-15T09:30:00"));
        assert_eq!(
            parse("2024-01-15T09:30:12.250").as_deref(),
            Some("2024-01-15T09:30:12")
        );
        assert_eq!(parse("2024-01-15T09:30:00Z").as_deref(), Some("2024-01-15T09:30:00Z"));
        assert_eq!(
            parse("2024-01-15T09:30:00+02:00").as_deref(),
            Some("2024-01-15T07:30:00Z")
        );
        assert_eq!(parse("2024-01-15 18:05:09").as_deref(), Some("2024-01-15T18:05:09"));
        assert_eq!(parse("2024/03/09").as_deref(), Some("2024-03-09"));
    }

    #[test]
    fn month_names_and_twelve_hour_times() {
        assert_eq!(parse("January 15, 2024").as_deref(), Some("2024-01-15"));
        assert_eq!(parse("Jan 5 2024").as_deref(), Some("2024-01-05"));
        assert_eq!(parse("Sept. 3rd, 2024").as_deref(), Some("2024-09-03"));
        assert_eq!(
            parse("March 1, 2024 2:45 PM").as_deref(),
            Some("2024-03-01T14:45:00")
        );
        assert_eq!(
            parse("March 1, 2024 12:10 am").as_deref(),
            Some("2024-03-01T00:10:00")
        );
        assert_eq!(parse("15 March 2024").as_deref(), Some("2024-03-15"));
        assert_eq!(parse("Monday, January 15, 2024").as_deref(), Some("2024-01-15"));
        assert_eq!(parse("Smarch 15, 2024"), None);
    }

    #[test]
    fn calendar_is_validated() {
        assert_eq!(parse("02/29/2024").as_deref(), Some("2024-02-29"));
        assert_eq!(parse("02/29/2023"), None);
        assert_eq!(parse("2024-02-30"), None);
        assert_eq!(parse("April 31, 2024"), None);
        assert_eq!(parse("2024-01-15T25:00"), None);
    }

    #[test]
    fn fallback_requires_a_four_digit_year() {
        assert_eq!(parse("20240115").as_deref(), Some("2024-01-15"));
        assert_eq!(parse("15.01.2024").as_deref(), Some("2024-01-15"));
        assert_eq!(parse("15-Jan-2024").as_deref(), Some("2024-01-15"));
        assert_eq!(parse("12"), None);
        assert_eq!(parse("3/4"), None);
    }

    #[test]
    fn unparseable_text_warns() {
        let result = sanitize_date(&CellValue::text("not a date"));
        assert_eq!(result.value, None);
        assert!(result.warning);
        assert_eq!(result.warning_type, Some(WarningType::DateParsing));
    }

    #[test]
    fn empty_and_native_values() {
        assert_eq!(sanitize_date(&CellValue::Empty), SanitizeResult::empty());
        assert_eq!(sanitize_date(&CellValue::text("  ")), SanitizeResult::empty());
        assert_eq!(
            sanitize_date(&CellValue::Timestamp(1_705_276_800_000.0)),
            SanitizeResult::clean("2024-01-15".to_string())
        );
        let invalid = sanitize_date(&CellValue::Timestamp(f64::INFINITY));
        assert_eq!(invalid.value, None);
        assert!(invalid.warning);
        assert_eq!(
            sanitize_date(&CellValue::Number(20_240_115.0)).value.as_deref(),
            Some("2024-01-15")
        );
    }
}
