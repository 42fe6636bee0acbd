//! Request and response payloads exchanged with the rate service

use crate::dates::{format_date, parse_calendar_date};
use crate::error::Result;
use crate::interval::Interval;
use crate::series::CurrencySeries;
use crate::types::{CurrencyCode, Date};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Currency code to display name, ordered by code
pub type CurrencyCatalog = BTreeMap<CurrencyCode, String>;

/// Body of `GET /currencies`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrenciesResponse {
    pub currencies: CurrencyCatalog,
}

/// Body of `POST /exchange-rates`; also the form fields of `/analyze-csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateRequest {
    pub currencies: Vec<CurrencyCode>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub interval: Interval,
}

impl ExchangeRateRequest {
    pub fn new(currencies: Vec<CurrencyCode>, start: Date, end: Date, interval: Interval) -> Self {
        Self {
            currencies,
            start_date: format_date(start),
            end_date: format_date(end),
            interval,
        }
    }

    /// Currencies as the comma-joined form field used by the upload endpoint
    pub fn currencies_field(&self) -> String {
        self.currencies.join(",")
    }

    pub fn start(&self) -> Result<Date> {
        parse_calendar_date(&self.start_date)
    }

    pub fn end(&self) -> Result<Date> {
        parse_calendar_date(&self.end_date)
    }
}

/// Outcome reported by the service alongside the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    #[default]
    Success,
    /// Some currencies failed; see `errors`
    Partial,
    Error,
}

/// Body of `POST /exchange-rates` and `POST /analyze-csv`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesResponse {
    #[serde(default)]
    pub data: Vec<CurrencySeries>,
    #[serde(default)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

impl SeriesResponse {
    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            data: Vec::new(),
            status: ResponseStatus::Error,
            message: Some(message.into()),
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }

    /// Per-currency failures reported next to successful data
    pub fn warnings(&self) -> &[String] {
        self.errors.as_deref().unwrap_or(&[])
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Error body returned by the service on non-2xx answers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.detail.or(self.message)
    }
}
