//! Request orchestration
//!
//! One [`Controller`] owns the view state of a rate query:
//!
//! ```text
//! idle --submit--> loading --+--> succeeded
//!   ^                        +--> failed
//!   +------ next submit -----+
//! ```
//!
//! Every submission gets a [`RequestTicket`] carrying a fresh generation.
//! Only the response holding the newest ticket is applied. Anything older
//! is dropped, so a slow earlier request cannot overwrite a later one.

use crate::align::{align, AlignedRow};
use crate::api::{ExchangeRateRequest, SeriesResponse};
use crate::dates::{format_date, is_after_today};
use crate::error::{FxError, Result};
use crate::interval::Interval;
use crate::series::CurrencySeries;
use crate::sources::{CsvUpload, RateSource};
use crate::types::{CurrencyCode, Date};

pub const NO_CURRENCY_SELECTED: &str = "Please select at least one currency";
pub const NO_FILE_SELECTED: &str = "Please select a CSV file to upload";
pub const NO_DATE_RANGE: &str = "Please select a start and end date";
pub const API_FALLBACK_MESSAGE: &str = "No data available";
pub const CSV_FALLBACK_MESSAGE: &str = "Failed to analyze CSV file";

/// Where the series should come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceMode {
    /// Remote fetch from the rate service
    #[default]
    Api,
    /// Analysis of an uploaded CSV file
    CsvUpload,
}

impl SourceMode {
    pub fn fallback_message(&self) -> &'static str {
        match self {
            SourceMode::Api => API_FALLBACK_MESSAGE,
            SourceMode::CsvUpload => CSV_FALLBACK_MESSAGE,
        }
    }
}

/// What the user filled in
#[derive(Debug, Clone, PartialEq)]
pub struct RequestForm {
    pub mode: SourceMode,
    pub currencies: Vec<CurrencyCode>,
    /// Required in API mode; in upload mode a missing bound is left to the
    /// source, which uses the span of the file
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub interval: Interval,
    pub upload: Option<CsvUpload>,
}

impl RequestForm {
    pub fn api(currencies: Vec<CurrencyCode>, start_date: Date, end_date: Date) -> Self {
        Self {
            mode: SourceMode::Api,
            currencies,
            start_date: Some(start_date),
            end_date: Some(end_date),
            interval: Interval::Daily,
            upload: None,
        }
    }

    pub fn csv(
        currencies: Vec<CurrencyCode>,
        start_date: Option<Date>,
        end_date: Option<Date>,
        upload: Option<CsvUpload>,
    ) -> Self {
        Self {
            mode: SourceMode::CsvUpload,
            currencies,
            start_date,
            end_date,
            interval: Interval::Daily,
            upload,
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    fn request(&self) -> ExchangeRateRequest {
        ExchangeRateRequest {
            currencies: self.currencies.clone(),
            start_date: self.start_date.map(format_date).unwrap_or_default(),
            end_date: self.end_date.map(format_date).unwrap_or_default(),
            interval: self.interval,
        }
    }
}

/// Lifecycle of the current submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Successful result, ready for charting and export
#[derive(Debug, Clone, PartialEq)]
pub struct RateReport {
    pub series: Vec<CurrencySeries>,
    /// Wide table for the chart
    pub rows: Vec<AlignedRow>,
    pub message: Option<String>,
}

impl RateReport {
    pub fn from_series(series: Vec<CurrencySeries>, message: Option<String>) -> Self {
        let rows = align(&series);
        Self {
            series,
            rows,
            message,
        }
    }
}

/// Everything a front end needs to render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub phase: Phase,
    pub error: Option<String>,
    /// Per-currency failures that did not block the result
    pub warnings: Vec<String>,
    pub report: Option<RateReport>,
    /// Requested end date lies after today; the service clamps it
    pub clamp_notice: bool,
}

/// Identifies one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    generation: u64,
    mode: SourceMode,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }
}

/// Work the caller must hand to a [`RateSource`]
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub ticket: RequestTicket,
    pub request: ExchangeRateRequest,
    /// Present in upload mode
    pub upload: Option<CsvUpload>,
}

/// Owns the view state and drives the transitions
#[derive(Debug, Default)]
pub struct Controller {
    state: ViewState,
    generation: u64,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.phase == Phase::Loading
    }

    /// Validate the form and enter `Loading`.
    ///
    /// A rejected form never reaches the network: the state goes back to
    /// `Idle` with the validation message and the error is returned.
    pub fn begin(&mut self, form: &RequestForm, today: Date) -> Result<PendingRequest> {
        if let Err(e) = validate(form) {
            self.state = ViewState {
                error: Some(e.to_string()),
                ..ViewState::default()
            };
            return Err(e);
        }

        if self.is_loading() {
            log::warn!(
                "Submission {} superseded before it resolved",
                self.generation
            );
        }
        self.generation += 1;

        self.state = ViewState {
            phase: Phase::Loading,
            clamp_notice: form.mode == SourceMode::Api
                && form.end_date.is_some_and(|end| is_after_today(end, today)),
            ..ViewState::default()
        };

        let ticket = RequestTicket {
            generation: self.generation,
            mode: form.mode,
        };
        log::info!(
            "Submission {}: {:?} mode, {} currencies",
            ticket.generation,
            ticket.mode,
            form.currencies.len()
        );

        Ok(PendingRequest {
            ticket,
            request: form.request(),
            upload: match form.mode {
                SourceMode::Api => None,
                SourceMode::CsvUpload => form.upload.clone(),
            },
        })
    }

    /// Apply the outcome of a submission.
    ///
    /// Returns `false` and leaves the state alone when `ticket` is not the
    /// newest submission or nothing is loading.
    pub fn resolve(&mut self, ticket: RequestTicket, outcome: Result<SeriesResponse>) -> bool {
        if ticket.generation != self.generation || !self.is_loading() {
            log::warn!(
                "Dropping stale response for submission {} (current {})",
                ticket.generation,
                self.generation
            );
            return false;
        }

        match outcome {
            Ok(response) if response.has_data() => {
                let warnings = response.errors.unwrap_or_default();
                if !warnings.is_empty() {
                    log::warn!("Partial result: {}", warnings.join("; "));
                }
                self.state.phase = Phase::Succeeded;
                self.state.warnings = warnings;
                self.state.report = Some(RateReport::from_series(response.data, response.message));
            }
            Ok(response) => {
                let empty = FxError::EmptyResponse {
                    message: response.message,
                };
                self.fail(empty.user_message(ticket.mode.fallback_message()));
                self.state.warnings = response.errors.unwrap_or_default();
            }
            Err(e) => self.fail(e.user_message(ticket.mode.fallback_message())),
        }
        true
    }

    fn fail(&mut self, message: String) {
        log::warn!("Submission {} failed: {}", self.generation, message);
        self.state.phase = Phase::Failed;
        self.state.error = Some(message);
        self.state.report = None;
    }

    /// Validate, call `source`, and apply the answer
    pub async fn submit<S: RateSource>(
        &mut self,
        form: &RequestForm,
        source: &S,
        today: Date,
    ) -> Result<&ViewState> {
        let pending = self.begin(form, today)?;
        let outcome = dispatch(source, &pending).await;
        self.resolve(pending.ticket, outcome);
        Ok(&self.state)
    }
}

/// Send a pending request to the source matching its mode
pub async fn dispatch<S: RateSource>(source: &S, pending: &PendingRequest) -> Result<SeriesResponse> {
    match (pending.ticket.mode, &pending.upload) {
        (SourceMode::Api, _) => source.exchange_rates(&pending.request).await,
        (SourceMode::CsvUpload, Some(upload)) => source.analyze_csv(upload, &pending.request).await,
        (SourceMode::CsvUpload, None) => Err(FxError::Validation(NO_FILE_SELECTED.to_string())),
    }
}

fn validate(form: &RequestForm) -> Result<()> {
    if form.currencies.is_empty() {
        return Err(FxError::Validation(NO_CURRENCY_SELECTED.to_string()));
    }
    match form.mode {
        SourceMode::Api if form.start_date.is_none() || form.end_date.is_none() => {
            return Err(FxError::Validation(NO_DATE_RANGE.to_string()));
        }
        SourceMode::CsvUpload if form.upload.is_none() => {
            return Err(FxError::Validation(NO_FILE_SELECTED.to_string()));
        }
        _ => {}
    }
    Ok(())
}
