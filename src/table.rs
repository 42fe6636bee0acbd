//! Wide rate table: pivot long records, filter, resample, summarise
//!
//! This is the data path behind [`LocalRateSource`](crate::sources::LocalRateSource):
//! long-format records are pivoted into `date -> currency -> rate`, narrowed
//! to the requested window and currencies, resampled to the requested
//! interval and finally turned into per-currency series with statistics.

use crate::api::{ResponseStatus, SeriesResponse};
use crate::dates::{format_date, parse_calendar_date};
use crate::error::{FxError, Result};
use crate::export::FlatRecord;
use crate::interval::Interval;
use crate::series::CurrencySeries;
use crate::types::{CurrencyCode, Date, Rate};
use std::collections::{BTreeMap, BTreeSet};

/// Rates keyed by calendar date, then by currency
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rows: BTreeMap<Date, BTreeMap<CurrencyCode, Rate>>,
    /// Currencies holding at least one value, in first-seen order
    columns: Vec<CurrencyCode>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pivot long records into a table.
    ///
    /// A second record for the same `(date, currency)` is rejected.
    pub fn pivot(records: &[FlatRecord]) -> Result<Self> {
        let mut table = Self::new();
        for record in records {
            let date = parse_calendar_date(&record.date)?;
            if table.get(date, &record.currency).is_some() {
                return Err(FxError::Data(format!(
                    "Index contains duplicate entries, cannot reshape ({} {})",
                    record.currency, record.date
                )));
            }
            table.insert(date, &record.currency, record.rate);
        }
        Ok(table)
    }

    pub fn insert(&mut self, date: Date, currency: &str, rate: Rate) {
        self.add_column(currency);
        self.rows
            .entry(date)
            .or_default()
            .insert(currency.to_string(), rate);
    }

    fn add_column(&mut self, currency: &str) {
        if !self.columns.iter().any(|c| c == currency) {
            self.columns.push(currency.to_string());
        }
    }

    pub fn get(&self, date: Date, currency: &str) -> Option<Rate> {
        self.rows.get(&date).and_then(|row| row.get(currency)).copied()
    }

    pub fn columns(&self) -> &[CurrencyCode] {
        &self.columns
    }

    pub fn has_column(&self, currency: &str) -> bool {
        self.columns.iter().any(|c| c == currency)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of dated rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn date_range(&self) -> Option<(Date, Date)> {
        let first = self.rows.keys().next()?;
        let last = self.rows.keys().next_back()?;
        Some((*first, *last))
    }

    /// Keep rows with `start <= date <= end`; currencies left without
    /// values stop being columns
    pub fn filter_range(&self, start: Date, end: Date) -> Self {
        let rows: BTreeMap<_, _> = self
            .rows
            .range(start..=end)
            .map(|(d, row)| (*d, row.clone()))
            .collect();
        Self {
            columns: populated_columns(&self.columns, &rows),
            rows,
        }
    }

    /// Keep only the listed currencies; rows left empty are dropped
    pub fn filter_currencies(&self, currencies: &[CurrencyCode]) -> Self {
        let wanted: BTreeSet<&str> = currencies.iter().map(String::as_str).collect();
        let rows: BTreeMap<_, _> = self
            .rows
            .iter()
            .filter_map(|(d, row)| {
                let kept: BTreeMap<_, _> = row
                    .iter()
                    .filter(|(c, _)| wanted.contains(c.as_str()))
                    .map(|(c, r)| (c.clone(), *r))
                    .collect();
                (!kept.is_empty()).then_some((*d, kept))
            })
            .collect();
        Self {
            columns: populated_columns(&self.columns, &rows),
            rows,
        }
    }

    /// Downsample to `interval`.
    ///
    /// Each currency keeps its last observation per period and the row is
    /// labelled with the period end. Periods where any column has no value
    /// are dropped. Daily data passes through untouched.
    pub fn resample(&self, interval: Interval) -> Self {
        if interval == Interval::Daily || self.is_empty() {
            return self.clone();
        }

        let mut buckets: BTreeMap<Date, BTreeMap<CurrencyCode, Rate>> = BTreeMap::new();
        // rows iterate in date order, so later inserts are later observations
        for (date, row) in &self.rows {
            let bucket = buckets.entry(interval.period_end(*date)).or_default();
            for (currency, rate) in row {
                bucket.insert(currency.clone(), *rate);
            }
        }

        let before = buckets.len();
        buckets.retain(|_, row| self.columns.iter().all(|c| row.contains_key(c)));
        if buckets.len() < before {
            log::debug!(
                "Resample to {} dropped {} incomplete periods",
                interval,
                before - buckets.len()
            );
        }

        Self {
            rows: buckets,
            columns: self.columns.clone(),
        }
    }

    /// Observations of one currency in date order
    pub fn column(&self, currency: &str) -> (Vec<String>, Vec<Rate>) {
        self.rows
            .iter()
            .filter_map(|(d, row)| row.get(currency).map(|r| (format_date(*d), *r)))
            .unzip()
    }

    /// Turn the table into the service response for `requested` currencies
    pub fn build_response(&self, requested: &[CurrencyCode]) -> SeriesResponse {
        let mut data = Vec::new();
        let mut failed = Vec::new();

        for currency in requested {
            if !self.has_column(currency) {
                log::warn!("Currency {} not in data", currency);
                failed.push(format!("{} (Not available in data)", currency));
                continue;
            }

            let (dates, rates) = self.column(currency);
            match CurrencySeries::from_observations(currency.clone(), dates, rates) {
                Ok(series) => {
                    log::debug!(
                        "Processed {}: {} data points",
                        currency,
                        series.len()
                    );
                    data.push(series);
                }
                Err(FxError::Data(reason)) => failed.push(format!("{} ({})", currency, reason)),
                Err(e) => failed.push(format!("{} ({})", currency, e)),
            }
        }

        if data.is_empty() {
            return SeriesResponse::failure(
                "No data found for any of the specified currencies",
                failed,
            );
        }

        let message = format!(
            "Successfully retrieved data for {} out of {} currencies",
            data.len(),
            requested.len()
        );
        SeriesResponse {
            data,
            status: if failed.is_empty() {
                ResponseStatus::Success
            } else {
                ResponseStatus::Partial
            },
            message: Some(message),
            errors: if failed.is_empty() { None } else { Some(failed) },
        }
    }
}

fn populated_columns(
    columns: &[CurrencyCode],
    rows: &BTreeMap<Date, BTreeMap<CurrencyCode, Rate>>,
) -> Vec<CurrencyCode> {
    columns
        .iter()
        .filter(|c| rows.values().any(|row| row.contains_key(c.as_str())))
        .cloned()
        .collect()
}
