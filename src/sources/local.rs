//! Offline rate source backed by an in-memory long-format store
//!
//! Answers the same contract as the remote service. Rejections mirror the
//! service's 400 answers so callers handle both sources alike. Uploaded
//! files are analysed and then forgotten.

use super::{CsvUpload, RateSource};
use crate::api::{CurrencyCatalog, ExchangeRateRequest, SeriesResponse};
use crate::currencies::fallback_currencies;
use crate::dates::{format_date, parse_calendar_date, today};
use crate::error::{FxError, Result};
use crate::export::{read_flat, FlatRecord, TEMPLATE_CSV};
use crate::table::RateTable;
use crate::types::{CurrencyCode, Date, MIN_START_YEAR};
use chrono::Datelike;
use std::io::Read;
use std::path::Path;

/// Rate source answering from a local table
#[derive(Debug, Clone)]
pub struct LocalRateSource {
    store: RateTable,
    today: Option<Date>,
}

impl LocalRateSource {
    pub fn new(store: RateTable) -> Self {
        Self { store, today: None }
    }

    /// Load the store from long-format CSV
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let records = read_flat(reader)?;
        Ok(Self::new(RateTable::pivot(&records)?))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let source = Self::from_reader(std::io::BufReader::new(file))?;
        log::info!(
            "Loaded {} dated rows for {} currencies from {}",
            source.store.len(),
            source.store.columns().len(),
            path.display()
        );
        Ok(source)
    }

    /// Pin "today", which end dates are clamped to
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &RateTable {
        &self.store
    }

    fn today(&self) -> Date {
        self.today.unwrap_or_else(today)
    }

    /// Check a remote-fetch request; returns the effective window
    fn validate(&self, request: &ExchangeRateRequest) -> Result<(Date, Date)> {
        let (start, end) = match (request.start(), request.end()) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(e), _) | (_, Err(e)) => return Err(bad_request(format!("Invalid date format: {}", e))),
        };

        if start >= end {
            return Err(bad_request("Start date must be before end date"));
        }
        if start.year() < MIN_START_YEAR {
            return Err(bad_request("Start date must be 1999-01-04 or later"));
        }

        let today = self.today();
        if end > today {
            log::info!(
                "Clamping end date {} to {}",
                request.end_date,
                format_date(today)
            );
            return Ok((start, today));
        }
        Ok((start, end))
    }

    fn answer(
        table: &RateTable,
        requested: &[CurrencyCode],
        start: Date,
        end: Date,
        request: &ExchangeRateRequest,
        empty_message: &str,
        empty_error: &str,
    ) -> SeriesResponse {
        let window = table
            .filter_range(start, end)
            .filter_currencies(requested);
        if window.is_empty() {
            return SeriesResponse::failure(empty_message, vec![empty_error.to_string()]);
        }

        let resampled = window.resample(request.interval);
        if resampled.is_empty() {
            return SeriesResponse::failure(
                "No data available after resampling",
                vec!["Data is empty after applying the selected interval".to_string()],
            );
        }

        resampled.build_response(requested)
    }

    /// Analyse an uploaded file.
    ///
    /// Records are narrowed to the window and currencies before pivoting, so
    /// duplicates elsewhere in the file do not matter.
    fn analyze(&self, upload: &CsvUpload, request: &ExchangeRateRequest) -> Result<SeriesResponse> {
        let records = read_flat(upload.contents.as_slice()).map_err(|e| match e {
            FxError::Validation(msg) => bad_request(msg),
            other => processing_error(other),
        })?;

        let mut dated = Vec::with_capacity(records.len());
        for record in records {
            let date = parse_calendar_date(&record.date).map_err(processing_error)?;
            dated.push((date, record));
        }

        let requested: Vec<CurrencyCode> = if request.currencies.is_empty() {
            let mut seen: Vec<CurrencyCode> = Vec::new();
            for (_, record) in &dated {
                if !seen.contains(&record.currency) {
                    seen.push(record.currency.clone());
                }
            }
            seen
        } else {
            request.currencies.clone()
        };

        let file_range = dated
            .iter()
            .map(|(date, _)| *date)
            .min()
            .zip(dated.iter().map(|(date, _)| *date).max());
        let Some((file_start, file_end)) = file_range else {
            return Ok(SeriesResponse::failure(
                "No data found in CSV for the specified criteria",
                vec!["Failed to process CSV data".to_string()],
            ));
        };
        let start = optional_date(&request.start_date, file_start)?;
        let end = optional_date(&request.end_date, file_end)?;

        let total = dated.len();
        let window: Vec<FlatRecord> = dated
            .into_iter()
            .filter(|(date, record)| {
                (start..=end).contains(date) && requested.contains(&record.currency)
            })
            .map(|(_, record)| record)
            .collect();
        let table = RateTable::pivot(&window).map_err(processing_error)?;

        log::info!(
            "Analyzing {} ({} of {} records in window) for {} currencies",
            upload.file_name,
            window.len(),
            total,
            requested.len()
        );

        Ok(Self::answer(
            &table,
            &requested,
            start,
            end,
            request,
            "No data found in CSV for the specified criteria",
            "Failed to process CSV data",
        ))
    }
}

fn optional_date(raw: &str, default: Date) -> Result<Date> {
    if raw.trim().is_empty() {
        return Ok(default);
    }
    parse_calendar_date(raw).map_err(processing_error)
}

fn bad_request(message: impl Into<String>) -> FxError {
    FxError::Upstream {
        status: 400,
        message: Some(message.into()),
    }
}

fn processing_error(e: FxError) -> FxError {
    FxError::Upstream {
        status: 500,
        message: Some(format!("Error processing CSV: {}", e)),
    }
}

impl RateSource for LocalRateSource {
    async fn currencies(&self) -> Result<CurrencyCatalog> {
        let mut catalog = fallback_currencies();
        if !self.store.columns().is_empty() {
            catalog.retain(|code, _| self.store.has_column(code));
            for code in self.store.columns() {
                catalog.entry(code.clone()).or_insert_with(|| code.clone());
            }
        }
        Ok(catalog)
    }

    async fn exchange_rates(&self, request: &ExchangeRateRequest) -> Result<SeriesResponse> {
        let (start, end) = self.validate(request)?;
        Ok(Self::answer(
            &self.store,
            &request.currencies,
            start,
            end,
            request,
            "No data found for the specified criteria",
            "No stored rates cover the requested window",
        ))
    }

    async fn analyze_csv(
        &self,
        upload: &CsvUpload,
        request: &ExchangeRateRequest,
    ) -> Result<SeriesResponse> {
        self.analyze(upload, request)
    }

    async fn download_template(&self) -> Result<Vec<u8>> {
        Ok(TEMPLATE_CSV.as_bytes().to_vec())
    }

    fn name(&self) -> &str {
        "local store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn source() -> LocalRateSource {
        LocalRateSource::from_reader(TEMPLATE_CSV.as_bytes())
            .unwrap()
            .with_today(d(2024, 1, 10))
    }

    fn request(start: &str, end: &str) -> ExchangeRateRequest {
        ExchangeRateRequest {
            currencies: vec!["EUR".to_string()],
            start_date: start.to_string(),
            end_date: end.to_string(),
            interval: Interval::Daily,
        }
    }

    #[test]
    fn test_validate_order_and_year() {
        let src = source();
        let err = src.validate(&request("2024-01-02", "2024-01-02")).unwrap_err();
        assert_eq!(err.server_message(), Some("Start date must be before end date"));

        let err = src.validate(&request("1998-12-01", "2024-01-02")).unwrap_err();
        assert_eq!(
            err.server_message(),
            Some("Start date must be 1999-01-04 or later")
        );

        let err = src.validate(&request("01/02/2024", "2024-01-02")).unwrap_err();
        assert!(err.server_message().unwrap().starts_with("Invalid date format"));
    }

    #[test]
    fn test_validate_clamps_future_end() {
        let (start, end) = source()
            .validate(&request("2024-01-01", "2025-06-01"))
            .unwrap();
        assert_eq!(start, d(2024, 1, 1));
        assert_eq!(end, d(2024, 1, 10));
    }

    #[test]
    fn test_optional_date_defaults() {
        assert_eq!(optional_date("", d(2024, 1, 1)).unwrap(), d(2024, 1, 1));
        assert_eq!(optional_date("2024-02-01", d(2024, 1, 1)).unwrap(), d(2024, 2, 1));
        assert!(optional_date("nope", d(2024, 1, 1)).is_err());
    }
}
