//! Sampling interval types and period bucketing

use crate::error::{FxError, Result};
use crate::types::Date;
use chrono::{Datelike, Duration};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Requested sampling granularity for a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    /// One observation per published day
    #[default]
    #[serde(rename = "1d")]
    Daily,
    /// Last observation of each week (weeks end on Sunday)
    #[serde(rename = "1wk")]
    Weekly,
    /// Last observation of each calendar month
    #[serde(rename = "1mo")]
    Monthly,
}

impl Interval {
    pub const ALL: [Interval; 3] = [Interval::Daily, Interval::Weekly, Interval::Monthly];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    /// Label of the period `date` falls into.
    ///
    /// Daily periods are the day itself, weekly periods end on Sunday,
    /// monthly periods end on the last day of the month.
    pub fn period_end(&self, date: Date) -> Date {
        match self {
            Interval::Daily => date,
            Interval::Weekly => {
                let to_sunday = 6 - date.weekday().num_days_from_monday() as i64;
                date + Duration::days(to_sunday)
            }
            Interval::Monthly => last_day_of_month(date),
        }
    }
}

fn last_day_of_month(date: Date) -> Date {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    Date::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(date)
}

impl FromStr for Interval {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Interval::Daily),
            "1wk" => Ok(Interval::Weekly),
            "1mo" => Ok(Interval::Monthly),
            _ => Err(FxError::InvalidInterval(s.to_string())),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
