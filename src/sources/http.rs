//! HTTP client for the rate service
//!
//! Transport failures surface as [`FxError::Connectivity`] naming the full
//! endpoint URL; non-2xx answers as [`FxError::Upstream`] with the server's
//! `detail`/`message` text when it sent one. No retries.

use super::{CsvUpload, RateSource};
use crate::api::{
    CurrenciesResponse, CurrencyCatalog, ErrorBody, ExchangeRateRequest, SeriesResponse,
};
use crate::error::{FxError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rate service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    client: Client,
    base_url: String,
}

impl HttpRateSource {
    /// Create a client for the service rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fx-reconcile/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FxError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of `path` on this service
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<Response> {
        log::debug!("Calling {}", endpoint);
        let response = request.send().await.map_err(|e| connectivity(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // best effort: a body we cannot read just means no server message
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message);
        log::warn!("{} returned {}", endpoint, status);
        Err(FxError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| connectivity(endpoint, e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            FxError::Data(format!("Malformed response from {}: {}", endpoint, e))
        })
    }
}

fn connectivity(endpoint: &str, e: reqwest::Error) -> FxError {
    FxError::Connectivity {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}

impl RateSource for HttpRateSource {
    async fn currencies(&self) -> Result<CurrencyCatalog> {
        let endpoint = self.endpoint("currencies");
        let response = self.send(&endpoint, self.client.get(&endpoint)).await?;
        let body: CurrenciesResponse = Self::decode(&endpoint, response).await?;
        Ok(body.currencies)
    }

    async fn exchange_rates(&self, request: &ExchangeRateRequest) -> Result<SeriesResponse> {
        let endpoint = self.endpoint("exchange-rates");
        log::info!(
            "Requesting {} currencies {}..{} ({})",
            request.currencies.len(),
            request.start_date,
            request.end_date,
            request.interval
        );
        let response = self
            .send(&endpoint, self.client.post(&endpoint).json(request))
            .await?;
        Self::decode(&endpoint, response).await
    }

    async fn analyze_csv(
        &self,
        upload: &CsvUpload,
        request: &ExchangeRateRequest,
    ) -> Result<SeriesResponse> {
        let endpoint = self.endpoint("analyze-csv");
        let file = Part::bytes(upload.contents.clone())
            .file_name(upload.file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| FxError::Data(format!("Invalid upload part: {}", e)))?;
        let form = Form::new()
            .part("file", file)
            .text("currencies", request.currencies_field())
            .text("start_date", request.start_date.clone())
            .text("end_date", request.end_date.clone())
            .text("interval", request.interval.as_str());

        log::info!(
            "Uploading {} ({} bytes) for analysis",
            upload.file_name,
            upload.contents.len()
        );
        let response = self
            .send(&endpoint, self.client.post(&endpoint).multipart(form))
            .await?;
        Self::decode(&endpoint, response).await
    }

    async fn download_template(&self) -> Result<Vec<u8>> {
        let endpoint = self.endpoint("download-template");
        let response = self.send(&endpoint, self.client.get(&endpoint)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| connectivity(&endpoint, e))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}
