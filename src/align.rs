//! Series alignment: many independently dated series into one wide table
//!
//! Every distinct date string seen in any input series becomes exactly one
//! [`AlignedRow`]. A currency's field on a row is present only when that
//! currency observed that exact date; nothing is interpolated or carried
//! forward, so charts skip the point instead.
//!
//! # Example
//!
//! ```rust
//! use fx_reconcile::align::align;
//! use fx_reconcile::series::CurrencySeries;
//!
//! let inr = CurrencySeries::from_observations(
//!     "INR",
//!     vec!["2024-01-01".into(), "2024-02-01".into()],
//!     vec![83.1, 83.5],
//! ).unwrap();
//! let jpy = CurrencySeries::from_observations("JPY", vec!["2024-01-01".into()], vec![148.2]).unwrap();
//!
//! let rows = align(&[inr, jpy]);
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].get("JPY"), Some(148.2));
//! assert_eq!(rows[1].get("JPY"), None);
//! ```

use crate::dates::DateKey;
use crate::series::CurrencySeries;
use crate::types::{CurrencyCode, Rate};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the wide table.
///
/// Serialises as a flat object: `{"date": "...", "EUR": 0.92, "JPY": 148.2}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignedRow {
    pub date: String,
    #[serde(flatten)]
    pub rates: BTreeMap<CurrencyCode, Rate>,
}

impl AlignedRow {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            rates: BTreeMap::new(),
        }
    }

    /// Rate for `currency` on this row's date, if that currency observed it
    pub fn get(&self, currency: &str) -> Option<Rate> {
        self.rates.get(currency).copied()
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    /// Number of currencies populated on this row
    pub fn populated(&self) -> usize {
        self.rates.len()
    }
}

/// Align any number of series on their dates.
///
/// Rows come out ascending by calendar date whatever order the series arrive
/// in. Duplicate dates inside one series overwrite: the last one wins.
pub fn align(series: &[CurrencySeries]) -> Vec<AlignedRow> {
    let mut by_date: HashMap<&str, AlignedRow> = HashMap::new();

    for s in series {
        if s.is_empty() {
            log::debug!("{}: no observations, contributes no rows", s.currency);
            continue;
        }
        for (date, rate) in s.observations() {
            by_date
                .entry(date)
                .or_insert_with(|| AlignedRow::new(date))
                .rates
                .insert(s.currency.clone(), rate);
        }
    }

    // parse each date once, not on every comparison
    let mut keyed: Vec<(DateKey<'_>, AlignedRow)> = by_date
        .into_iter()
        .map(|(date, row)| (DateKey::new(date), row))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    let rows: Vec<AlignedRow> = keyed.into_iter().map(|(_, row)| row).collect();

    log::debug!(
        "Aligned {} series into {} rows",
        series.len(),
        rows.len()
    );
    rows
}

/// Currency codes in input order, skipping repeats; handy as chart legend
pub fn legend(series: &[CurrencySeries]) -> Vec<&str> {
    let mut seen = Vec::with_capacity(series.len());
    for s in series {
        if !seen.contains(&s.currency.as_str()) {
            seen.push(s.currency.as_str());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(currency: &str, points: &[(&str, f64)]) -> CurrencySeries {
        CurrencySeries::from_observations(
            currency,
            points.iter().map(|(d, _)| d.to_string()).collect(),
            points.iter().map(|(_, r)| *r).collect(),
        )
        .unwrap()
    }

    fn raw(currency: &str, dates: &[&str], rates: &[f64]) -> CurrencySeries {
        CurrencySeries {
            currency: currency.to_string(),
            dates: dates.iter().map(|d| d.to_string()).collect(),
            rates: rates.to_vec(),
            start_rate: 0.0,
            end_rate: 0.0,
            min_rate: 0.0,
            max_rate: 0.0,
            percentage_change: 0.0,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(align(&[]).is_empty());
    }

    #[test]
    fn test_shared_and_missing_dates() {
        let rows = align(&[
            series("INR", &[("2024-01-01", 83.1), ("2024-02-01", 83.5)]),
            series("JPY", &[("2024-01-01", 148.2)]),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-01-01");
        assert_eq!(rows[0].get("INR"), Some(83.1));
        assert_eq!(rows[0].get("JPY"), Some(148.2));
        assert_eq!(rows[1].date, "2024-02-01");
        assert_eq!(rows[1].get("INR"), Some(83.5));
        assert_eq!(rows[1].get("JPY"), None);
    }

    #[test]
    fn test_disjoint_dates_one_currency_per_row() {
        let rows = align(&[
            series("EUR", &[("2024-01-03", 0.91)]),
            series("GBP", &[("2024-01-01", 0.78), ("2024-01-05", 0.79)]),
        ]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.populated() == 1));
        let dates: Vec<_> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-03", "2024-01-05"]);
    }

    #[test]
    fn test_input_order_irrelevant() {
        let a = series("EUR", &[("2024-03-01", 0.92), ("2024-01-01", 0.90)]);
        let b = series("JPY", &[("2024-02-01", 141.0)]);
        assert_eq!(align(&[a.clone(), b.clone()]), align(&[b, a]));
    }

    #[test]
    fn test_duplicate_date_last_wins() {
        let rows = align(&[raw(
            "EUR",
            &["2024-01-01", "2024-01-01"],
            &[0.90, 0.95],
        )]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("EUR"), Some(0.95));
    }

    #[test]
    fn test_empty_series_contributes_nothing() {
        let rows = align(&[raw("CHF", &[], &[]), series("EUR", &[("2024-01-01", 0.9)])]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("CHF"), None);
    }

    #[test]
    fn test_calendar_order_for_unpadded_dates() {
        let rows = align(&[raw("EUR", &["2024-10-1", "2024-9-30"], &[0.93, 0.92])]);
        assert_eq!(rows[0].date, "2024-9-30");
        assert_eq!(rows[1].date, "2024-10-1");
    }

    #[test]
    fn test_unparseable_dates_sort_last() {
        let rows = align(&[
            raw("EUR", &["n/a", "2024-01-03", "2024-1-2"], &[0.1, 0.93, 0.92]),
            raw("GBP", &["bad", "2023-12-29"], &[0.2, 0.78]),
        ]);
        let dates: Vec<_> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2023-12-29", "2024-1-2", "2024-01-03", "bad", "n/a"]);
    }

    #[test]
    fn test_row_serializes_flat() {
        let rows = align(&[
            series("INR", &[("2024-02-01", 83.5)]),
            series("JPY", &[("2024-01-01", 148.2)]),
        ]);
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"date": "2024-01-01", "JPY": 148.2},
                {"date": "2024-02-01", "INR": 83.5}
            ])
        );
    }

    #[test]
    fn test_legend_keeps_first_seen_order() {
        let s = vec![
            series("JPY", &[("2024-01-01", 1.0)]),
            series("EUR", &[("2024-01-01", 1.0)]),
            series("JPY", &[("2024-01-02", 1.0)]),
        ];
        assert_eq!(legend(&s), vec!["JPY", "EUR"]);
    }
}
