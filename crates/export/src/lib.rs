//! CSV output for everything the pipeline produces.
//!
//! Dates are written as `YYYY-MM-DD` and missing values as empty cells.

use analytics::{CandleSeries, CorrelationMatrix};
use chrono::NaiveDate;
use collector::ClosingPrices;
use core_types::WideTable;
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use universe::Universe;

pub mod error;

pub use error::ExportError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Writes a wide table with a leading `date` column.
pub fn write_wide_table(path: &Path, table: &WideTable) -> Result<(), ExportError> {
    let mut writer = create(path)?;

    let mut header = Vec::with_capacity(table.width() + 1);
    header.push("date".to_string());
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;

    for (row, date) in table.dates.iter().enumerate() {
        let mut record = Vec::with_capacity(table.width() + 1);
        record.push(date.format(DATE_FORMAT).to_string());
        record.extend(
            table
                .values
                .iter()
                .map(|column| cell(column.get(row).copied().flatten())),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = table.height(), columns = table.width(), "Table written.");
    Ok(())
}

/// Reads a table written by [`write_wide_table`].
pub fn read_wide_table(path: &Path) -> Result<WideTable, ExportError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut fields = headers.iter();
    match fields.next() {
        Some("date") => {}
        other => {
            return Err(ExportError::Format(format!(
                "first column must be 'date', found {:?}",
                other
            )));
        }
    }
    let columns: Vec<String> = fields.map(str::to_string).collect();

    let mut dates = Vec::new();
    let mut values: Vec<Vec<Option<Decimal>>> = vec![Vec::new(); columns.len()];
    for record in reader.records() {
        let record = record?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|e| ExportError::Format(format!("bad date '{}': {}", raw_date, e)))?;
        dates.push(date);

        for (i, column) in values.iter_mut().enumerate() {
            let raw = record.get(i + 1).unwrap_or_default().trim();
            let value = if raw.is_empty() {
                None
            } else {
                Some(
                    Decimal::from_str(raw)
                        .map_err(|e| ExportError::Format(format!("bad value '{}': {}", raw, e)))?,
                )
            };
            column.push(value);
        }
    }

    let mut table = WideTable::new(dates);
    for (name, column) in columns.into_iter().zip(values) {
        table.push_column(name, column)?;
    }
    Ok(table)
}

/// Writes the selected constituents in download order.
pub fn write_universe(path: &Path, universe: &Universe) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    writer.write_record([
        "symbol",
        "security",
        "sector_code",
        "gics_sector",
        "sub_industry",
        "date_added",
    ])?;

    for assignment in &universe.assignments {
        let constituent = universe.constituent(&assignment.symbol);
        writer.write_record([
            assignment.symbol.as_str(),
            constituent.map(|c| c.security.as_str()).unwrap_or_default(),
            assignment.sector.code(),
            assignment.sector.name(),
            constituent.map(|c| c.sub_industry.as_str()).unwrap_or_default(),
            constituent
                .and_then(|c| c.date_added_raw.as_deref())
                .unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes every symbol that did not make it into the price tables.
pub fn write_skipped(path: &Path, prices: &ClosingPrices) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    writer.write_record(["symbol", "status", "reason"])?;

    let late = prices.late_listed.iter().map(|s| ("late_listed", s));
    let unavailable = prices.unavailable.iter().map(|s| ("unavailable", s));
    for (status, skipped) in late.chain(unavailable) {
        writer.write_record([skipped.symbol.as_str(), status, skipped.reason.as_str()])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes a correlation matrix with a leading `label` column.
pub fn write_correlation(path: &Path, matrix: &CorrelationMatrix) -> Result<(), ExportError> {
    let mut writer = create(path)?;

    let mut header = Vec::with_capacity(matrix.len() + 1);
    header.push("label".to_string());
    header.extend(matrix.labels.iter().cloned());
    writer.write_record(&header)?;

    for (label, row) in matrix.labels.iter().zip(&matrix.values) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(label.clone());
        record.extend(row.iter().map(|v| v.map(|c| format!("{:.6}", c)).unwrap_or_default()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes OHLCV bars with one `sma_<window>` column per moving average.
pub fn write_candles(path: &Path, series: &CandleSeries) -> Result<(), ExportError> {
    let mut writer = create(path)?;

    let mut header: Vec<String> = ["date", "open", "high", "low", "close", "adj_close", "volume"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(series.averages.iter().map(|a| format!("sma_{}", a.window)));
    writer.write_record(&header)?;

    for (i, bar) in series.bars.iter().enumerate() {
        let mut record = vec![
            bar.date.format(DATE_FORMAT).to_string(),
            decimal(bar.open),
            decimal(bar.high),
            decimal(bar.low),
            decimal(bar.close),
            cell(bar.adj_close),
            bar.volume.to_string(),
        ];
        record.extend(
            series
                .averages
                .iter()
                .map(|a| cell(a.values.get(i).copied().flatten().map(|v| v.round_dp(6)))),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<csv::Writer<fs::File>, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(csv::Writer::from_path(path)?)
}

/// Prices are written without trailing zeros.
fn decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

fn cell(value: Option<Decimal>) -> String {
    value.map(decimal).unwrap_or_default()
}
