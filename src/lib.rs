//! # fx-reconcile
//!
//! Reconciles independently fetched exchange-rate series into one
//! date-aligned table for charting, and exports them as long-format CSV.
//!
//! Providers publish on different calendars and with gaps, so each
//! currency arrives with its own date axis. [`align`](align::align) merges
//! them into one row per distinct date; [`export_flat`](export::export_flat)
//! writes `Date,Currency,Rate` lines.
//!
//! ## Example
//!
//! ```rust
//! use fx_reconcile::prelude::*;
//!
//! let eur = CurrencySeries::from_observations(
//!     "EUR",
//!     vec!["2024-01-01".into(), "2024-01-02".into()],
//!     vec![0.92, 0.93],
//! ).unwrap();
//! let gbp = CurrencySeries::from_observations("GBP", vec!["2024-01-02".into()], vec![0.79]).unwrap();
//!
//! let rows = align(&[eur.clone(), gbp.clone()]);
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].get("GBP"), None);
//!
//! let csv = export_flat(&[eur, gbp]).unwrap();
//! assert!(csv.starts_with("Date,Currency,Rate\n"));
//! ```

pub mod align;
pub mod api;
#[cfg(feature = "cli")]
pub mod config;
pub mod controller;
pub mod currencies;
pub mod dates;
pub mod error;
pub mod export;
pub mod interval;
pub mod series;
pub mod sources;
pub mod table;
pub mod types;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::align::{align, AlignedRow};
    pub use crate::api::{CurrencyCatalog, ExchangeRateRequest, ResponseStatus, SeriesResponse};
    pub use crate::controller::{Controller, Phase, RateReport, RequestForm, SourceMode, ViewState};
    pub use crate::error::{FxError, Result};
    pub use crate::export::{export_flat, read_flat, write_flat, FlatRecord};
    pub use crate::interval::Interval;
    pub use crate::series::{CurrencySeries, SeriesStats};
    pub use crate::sources::{CsvUpload, LocalRateSource, RateSource};
    #[cfg(feature = "async")]
    pub use crate::sources::HttpRateSource;
    pub use crate::table::RateTable;
}
