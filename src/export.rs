//! Long-format (`Date,Currency,Rate`) export and import

use crate::error::{FxError, Result};
use crate::series::CurrencySeries;
use crate::types::{CurrencyCode, Rate, FLAT_HEADER};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Template offered for download so users can shape their own uploads
pub const TEMPLATE_CSV: &str = "Date,Currency,Rate
2024-01-01,EUR,0.92
2024-01-01,GBP,0.78
2024-01-01,JPY,140.50
2024-01-02,EUR,0.93
2024-01-02,GBP,0.79
2024-01-02,JPY,141.20";

/// Suggested file name for [`TEMPLATE_CSV`]
pub const TEMPLATE_FILE_NAME: &str = "exchange_rates_template.csv";

/// One `(date, currency, rate)` observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Currency")]
    pub currency: CurrencyCode,
    #[serde(rename = "Rate")]
    pub rate: Rate,
}

/// Every observation of every series: series order first, then date order
/// within the series. Nothing is deduplicated.
pub fn flatten(series: &[CurrencySeries]) -> impl Iterator<Item = FlatRecord> + '_ {
    series.iter().flat_map(|s| {
        s.observations().map(move |(date, rate)| FlatRecord {
            date: date.to_string(),
            currency: s.currency.clone(),
            rate,
        })
    })
}

/// Write the long-format CSV to `writer`, returning the number of data lines
pub fn write_flat<W: Write>(series: &[CurrencySeries], writer: W) -> Result<usize> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(FLAT_HEADER)?;

    let mut count = 0;
    for record in flatten(series) {
        // Display gives the shortest exact representation: 83.1 stays 83.1
        let rate = record.rate.to_string();
        wtr.write_record([record.date.as_str(), record.currency.as_str(), rate.as_str()])?;
        count += 1;
    }
    wtr.flush()?;

    log::debug!("Exported {} records from {} series", count, series.len());
    Ok(count)
}

/// Render the long-format CSV as text; empty input yields the header only
pub fn export_flat(series: &[CurrencySeries]) -> Result<String> {
    let mut buf = Vec::new();
    write_flat(series, &mut buf)?;
    String::from_utf8(buf).map_err(|e| FxError::Data(format!("Export is not UTF-8: {}", e)))
}

/// Parse long-format CSV.
///
/// The header must name `Date`, `Currency` and `Rate`; extra columns and
/// column order do not matter.
pub fn read_flat<R: Read>(reader: R) -> Result<Vec<FlatRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if !FLAT_HEADER
        .iter()
        .all(|col| headers.iter().any(|h| h == *col))
    {
        return Err(FxError::Validation(format!(
            "CSV must contain columns: {}",
            FLAT_HEADER.join(", ")
        )));
    }

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize::<FlatRecord>().enumerate() {
        let record = result.map_err(|e| {
            // header is line 1
            FxError::Data(format!("Invalid record at line {}: {}", line + 2, e))
        })?;
        records.push(record);
    }
    Ok(records)
}
