//! Calendar-date parsing and comparison shared by the aligner, the exporter
//! and the request controller.

use crate::error::{FxError, Result};
use crate::types::{Date, DATE_FORMAT};
use chrono::NaiveDateTime;
use std::cmp::Ordering;

const DATE_FORMATS: [&str; 2] = [DATE_FORMAT, "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse a calendar date.
///
/// Accepts `YYYY-MM-DD` (zero padding optional), `YYYY/MM/DD`, and a
/// datetime whose leading part is `YYYY-MM-DD`; the time of day is dropped.
pub fn parse_calendar_date(s: &str) -> Result<Date> {
    let s = s.trim();

    for fmt in DATE_FORMATS {
        if let Ok(date) = Date::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    Err(FxError::InvalidDate(s.to_string()))
}

/// Format a date as zero-padded `YYYY-MM-DD`
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Date-only strict comparison; time of day never enters into it
pub fn is_after_today(date: Date, today: Date) -> bool {
    date > today
}

/// Today's date in local time
pub fn today() -> Date {
    chrono::Local::now().date_naive()
}

/// Sort key for a raw date string.
///
/// Parsable strings order by calendar date and come first; the rest follow
/// in lexical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateKey<'a> {
    parsed: Option<Date>,
    raw: &'a str,
}

impl<'a> DateKey<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            parsed: parse_calendar_date(raw).ok(),
            raw,
        }
    }

    pub fn parsed(&self) -> Option<Date> {
        self.parsed
    }
}

impl Ord for DateKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.parsed, other.parsed) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.raw.cmp(other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(other.raw),
        }
    }
}

impl PartialOrd for DateKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
