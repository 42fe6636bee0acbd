//! Per-currency rate series and their summary statistics

use crate::error::{FxError, Result};
use crate::types::{CurrencyCode, Rate};
use serde::{Deserialize, Serialize};

/// One currency's observations, index-aligned (`dates[i]` carries `rates[i]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencySeries {
    pub currency: CurrencyCode,
    pub dates: Vec<String>,
    pub rates: Vec<Rate>,
    pub start_rate: Rate,
    pub end_rate: Rate,
    pub min_rate: Rate,
    pub max_rate: Rate,
    pub percentage_change: f64,
}

impl CurrencySeries {
    /// Build a series and derive its statistics from the observations
    pub fn from_observations(
        currency: impl Into<CurrencyCode>,
        dates: Vec<String>,
        rates: Vec<Rate>,
    ) -> Result<Self> {
        let currency = currency.into();
        if dates.len() != rates.len() {
            return Err(FxError::Data(format!(
                "{}: {} dates but {} rates",
                currency,
                dates.len(),
                rates.len()
            )));
        }
        let stats = SeriesStats::from_rates(&rates)?;
        Ok(Self {
            currency,
            dates,
            rates,
            start_rate: stats.start_rate,
            end_rate: stats.end_rate,
            min_rate: stats.min_rate,
            max_rate: stats.max_rate,
            percentage_change: stats.percentage_change,
        })
    }

    /// `(date, rate)` pairs in series order.
    ///
    /// A length mismatch is tolerated by stopping at the shorter side.
    pub fn observations(&self) -> impl Iterator<Item = (&str, Rate)> + '_ {
        self.dates
            .iter()
            .map(String::as_str)
            .zip(self.rates.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.dates.len().min(self.rates.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SeriesStats {
        SeriesStats {
            start_rate: self.start_rate,
            end_rate: self.end_rate,
            min_rate: self.min_rate,
            max_rate: self.max_rate,
            percentage_change: self.percentage_change,
        }
    }
}

/// Summary statistics shown next to each chart line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub start_rate: Rate,
    pub end_rate: Rate,
    pub min_rate: Rate,
    pub max_rate: Rate,
    /// Percent change from first to last observation, two decimals
    pub percentage_change: f64,
}

impl SeriesStats {
    pub fn from_rates(rates: &[Rate]) -> Result<Self> {
        let (first, last) = match (rates.first(), rates.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(FxError::Data("Empty dataset".to_string())),
        };
        if first == 0.0 {
            return Err(FxError::Data("Starting rate is zero".to_string()));
        }

        let min_rate = rates.iter().copied().fold(f64::INFINITY, f64::min);
        let max_rate = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            start_rate: first,
            end_rate: last,
            min_rate,
            max_rate,
            percentage_change: round2((last - first) / first * 100.0),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
