//! Request orchestration tests
//!
//! Drives the controller against a scripted source and against the local
//! store, checking which calls reach the source and what state results.

use chrono::NaiveDate;
use fx_reconcile::api::{CurrencyCatalog, ExchangeRateRequest, SeriesResponse};
use fx_reconcile::controller::{
    dispatch, Controller, Phase, RequestForm, API_FALLBACK_MESSAGE, CSV_FALLBACK_MESSAGE,
    NO_CURRENCY_SELECTED,
};
use fx_reconcile::error::{FxError, Result};
use fx_reconcile::export::TEMPLATE_CSV;
use fx_reconcile::interval::Interval;
use fx_reconcile::series::CurrencySeries;
use fx_reconcile::sources::{CsvUpload, LocalRateSource, RateSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Replays canned answers and records what it was asked
struct ScriptedSource {
    answer: fn() -> Result<SeriesResponse>,
    rate_calls: AtomicUsize,
    csv_calls: AtomicUsize,
    last_request: Mutex<Option<ExchangeRateRequest>>,
}

impl ScriptedSource {
    fn new(answer: fn() -> Result<SeriesResponse>) -> Self {
        Self {
            answer,
            rate_calls: AtomicUsize::new(0),
            csv_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.rate_calls.load(Ordering::SeqCst) + self.csv_calls.load(Ordering::SeqCst)
    }
}

impl RateSource for ScriptedSource {
    async fn currencies(&self) -> Result<CurrencyCatalog> {
        Ok(CurrencyCatalog::new())
    }

    async fn exchange_rates(&self, request: &ExchangeRateRequest) -> Result<SeriesResponse> {
        self.rate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        (self.answer)()
    }

    async fn analyze_csv(
        &self,
        _upload: &CsvUpload,
        request: &ExchangeRateRequest,
    ) -> Result<SeriesResponse> {
        self.csv_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        (self.answer)()
    }

    async fn download_template(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn eur_response() -> Result<SeriesResponse> {
    Ok(SeriesResponse {
        data: vec![CurrencySeries::from_observations(
            "EUR",
            vec!["2024-01-02".to_string(), "2024-01-03".to_string()],
            vec![0.91, 0.92],
        )?],
        message: Some("Successfully retrieved data for 1 out of 2 currencies".to_string()),
        errors: Some(vec!["XAU (Not available in API response)".to_string()]),
        ..SeriesResponse::default()
    })
}

fn empty_response() -> Result<SeriesResponse> {
    Ok(serde_json::from_str(r#"{"data": [], "message": null}"#)?)
}

fn unreachable_service() -> Result<SeriesResponse> {
    Err(FxError::Connectivity {
        endpoint: "http://localhost:8000/exchange-rates".to_string(),
        reason: "connection refused".to_string(),
    })
}

#[tokio::test]
async fn test_no_currencies_never_calls_source() {
    let source = ScriptedSource::new(eur_response);
    let mut ctl = Controller::new();
    let form = RequestForm::api(Vec::new(), d(2024, 1, 1), d(2024, 2, 1));

    let err = ctl.submit(&form, &source, d(2024, 6, 1)).await.unwrap_err();

    assert_eq!(err.to_string(), NO_CURRENCY_SELECTED);
    assert_eq!(source.calls(), 0);
    assert_eq!(ctl.state().phase, Phase::Idle);
    assert_eq!(ctl.state().error.as_deref(), Some("Please select at least one currency"));
}

#[tokio::test]
async fn test_empty_success_is_failure_with_fallback() {
    let source = ScriptedSource::new(empty_response);
    let mut ctl = Controller::new();
    let form = RequestForm::api(vec!["EUR".to_string()], d(2024, 1, 1), d(2024, 2, 1));

    let state = ctl.submit(&form, &source, d(2024, 6, 1)).await.unwrap();

    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.error.as_deref(), Some(API_FALLBACK_MESSAGE));
    assert!(state.report.is_none());
}

#[tokio::test]
async fn test_future_end_sets_clamp_notice_and_keeps_payload() {
    let source = ScriptedSource::new(eur_response);
    let mut ctl = Controller::new();
    let today = d(2024, 6, 1);
    let form = RequestForm::api(vec!["EUR".to_string()], d(2024, 1, 1), d(2024, 6, 2));

    let state = ctl.submit(&form, &source, today).await.unwrap();

    assert!(state.clamp_notice);
    assert_eq!(state.phase, Phase::Succeeded);
    let sent = source.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(sent.end_date, "2024-06-02");
    assert_eq!(source.rate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_partial_failure_becomes_warning() {
    let source = ScriptedSource::new(eur_response);
    let mut ctl = Controller::new();
    let form = RequestForm::api(
        vec!["EUR".to_string(), "XAU".to_string()],
        d(2024, 1, 1),
        d(2024, 2, 1),
    );

    let state = ctl.submit(&form, &source, d(2024, 6, 1)).await.unwrap();

    assert_eq!(state.phase, Phase::Succeeded);
    assert!(state.error.is_none());
    assert_eq!(state.warnings, vec!["XAU (Not available in API response)".to_string()]);
    let report = state.report.as_ref().unwrap();
    assert_eq!(report.rows.len(), 2);
}

#[tokio::test]
async fn test_connectivity_error_names_endpoint() {
    let source = ScriptedSource::new(unreachable_service);
    let mut ctl = Controller::new();
    let form = RequestForm::api(vec!["EUR".to_string()], d(2024, 1, 1), d(2024, 2, 1));

    let state = ctl.submit(&form, &source, d(2024, 6, 1)).await.unwrap();

    assert_eq!(state.phase, Phase::Failed);
    assert!(state
        .error
        .as_deref()
        .unwrap()
        .contains("http://localhost:8000/exchange-rates"));
}

#[tokio::test]
async fn test_csv_mode_routes_to_upload() {
    let source = ScriptedSource::new(empty_response);
    let mut ctl = Controller::new();
    let upload = CsvUpload::new("rates.csv", TEMPLATE_CSV.as_bytes().to_vec());
    let form = RequestForm::csv(
        vec!["EUR".to_string(), "GBP".to_string()],
        Some(d(2024, 1, 1)),
        Some(d(2024, 1, 2)),
        Some(upload),
    )
    .with_interval(Interval::Weekly);

    let state = ctl.submit(&form, &source, d(2024, 6, 1)).await.unwrap();

    assert_eq!(source.csv_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.rate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(state.error.as_deref(), Some(CSV_FALLBACK_MESSAGE));
    let sent = source.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(sent.currencies_field(), "EUR,GBP");
    assert_eq!(sent.interval, Interval::Weekly);
}

#[tokio::test]
async fn test_out_of_order_responses() {
    let source = ScriptedSource::new(eur_response);
    let mut ctl = Controller::new();
    let form = RequestForm::api(vec!["EUR".to_string()], d(2024, 1, 1), d(2024, 2, 1));

    let older = ctl.begin(&form, d(2024, 6, 1)).unwrap();
    let newer = ctl.begin(&form, d(2024, 6, 1)).unwrap();

    let newer_outcome = dispatch(&source, &newer).await;
    assert!(ctl.resolve(newer.ticket, newer_outcome));
    assert_eq!(ctl.state().phase, Phase::Succeeded);

    // the older request finally answers with an error; it must not win
    assert!(!ctl.resolve(older.ticket, unreachable_service()));
    assert_eq!(ctl.state().phase, Phase::Succeeded);
    assert!(ctl.state().error.is_none());
}

#[tokio::test]
async fn test_local_store_end_to_end() {
    let source = LocalRateSource::from_reader(TEMPLATE_CSV.as_bytes())
        .unwrap()
        .with_today(d(2024, 1, 2));
    let mut ctl = Controller::new();
    let form = RequestForm::api(
        vec!["EUR".to_string(), "JPY".to_string(), "CHF".to_string()],
        d(2024, 1, 1),
        d(2024, 1, 5),
    );

    let state = ctl.submit(&form, &source, d(2024, 1, 2)).await.unwrap();

    assert!(state.clamp_notice);
    assert_eq!(state.phase, Phase::Succeeded);
    assert_eq!(state.warnings, vec!["CHF (Not available in data)".to_string()]);
    let report = state.report.as_ref().unwrap();
    assert_eq!(report.series.len(), 2);
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[1].get("JPY"), Some(141.2));
}

#[tokio::test]
async fn test_local_store_rejection_surfaces_detail() {
    let source = LocalRateSource::from_reader(TEMPLATE_CSV.as_bytes())
        .unwrap()
        .with_today(d(2024, 6, 1));
    let mut ctl = Controller::new();
    let form = RequestForm::api(vec!["EUR".to_string()], d(2024, 2, 1), d(2024, 1, 1));

    let state = ctl.submit(&form, &source, d(2024, 6, 1)).await.unwrap();

    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.error.as_deref(), Some("Start date must be before end date"));
}
