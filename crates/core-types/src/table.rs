use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A raw, untyped table as scraped from a web page: one header row and
/// any number of string rows. Rows may be shorter than the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReferenceTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Rewrites every header to `snake_case`-ish form: spaces become
    /// underscores and letters are lowercased (`"Date first added"` ->
    /// `"date_first_added"`).
    pub fn normalize_columns(&mut self) {
        for column in &mut self.columns {
            *column = column.trim().replace(' ', "_").to_lowercase();
        }
    }

    /// Returns the index of the first column with the given header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the cell at `row`/`column`, or `None` when the row is short.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A date-indexed table of price columns, stored column-major.
///
/// Column names are not required to be unique: a table keyed by sector code
/// repeats the same label once per symbol in that sector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<Decimal>>>,
}

impl WideTable {
    /// Creates a table with the given date index and no columns.
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Appends a column. Its length must equal the number of dates.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<Decimal>>,
    ) -> Result<(), CoreError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(CoreError::LengthMismatch {
                column: name,
                expected: self.dates.len(),
                actual: values.len(),
            });
        }
        self.columns.push(name);
        self.values.push(values);
        Ok(())
    }

    pub fn column(&self, index: usize) -> Option<&[Option<Decimal>]> {
        self.values.get(index).map(Vec::as_slice)
    }

    /// Iterates over `(name, values)` pairs in column order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[Option<Decimal>])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Number of dates (rows).
    pub fn height(&self) -> usize {
        self.dates.len()
    }

    /// Number of price columns, excluding the date index.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
