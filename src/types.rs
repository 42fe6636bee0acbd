//! Core types and constants

use chrono::NaiveDate;

/// ISO-like currency identifier ("EUR", "JPY", ...)
pub type CurrencyCode = String;

/// Exchange rate against the base currency
pub type Rate = f64;

/// Calendar date used throughout the library
pub type Date = NaiveDate;

/// Base currency every rate is quoted against
pub const BASE_CURRENCY: &str = "USD";

/// Canonical date format on the wire and in exported files
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Earliest start year the reference-rate provider covers
pub const MIN_START_YEAR: i32 = 1999;

/// Header of the long-format CSV
pub const FLAT_HEADER: [&str; 3] = ["Date", "Currency", "Rate"];
