//! Rate sources: the collaborators that produce currency series
//!
//! - `HttpRateSource`: the remote rate service over HTTP (feature `async`)
//! - `LocalRateSource`: the same contract answered offline from a
//!   long-format CSV store held in memory

#[cfg(feature = "async")]
pub mod http;
pub mod local;

#[cfg(feature = "async")]
pub use http::HttpRateSource;
pub use local::LocalRateSource;

use crate::api::{CurrencyCatalog, ExchangeRateRequest, SeriesResponse};
use crate::error::Result;
use std::future::Future;
use std::path::Path;

/// A CSV file handed to a source as an opaque blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl CsvUpload {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk; the name sent along is the file's base name
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        Ok(Self {
            file_name,
            contents,
        })
    }
}

/// Trait for anything that can answer the rate service contract
pub trait RateSource: Send + Sync {
    /// `GET /currencies`
    fn currencies(&self) -> impl Future<Output = Result<CurrencyCatalog>> + Send;

    /// `POST /exchange-rates`
    fn exchange_rates(
        &self,
        request: &ExchangeRateRequest,
    ) -> impl Future<Output = Result<SeriesResponse>> + Send;

    /// `POST /analyze-csv`
    fn analyze_csv(
        &self,
        upload: &CsvUpload,
        request: &ExchangeRateRequest,
    ) -> impl Future<Output = Result<SeriesResponse>> + Send;

    /// `GET /download-template`, passed through unmodified
    fn download_template(&self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Where the data comes from, for messages
    fn name(&self) -> &str;
}
