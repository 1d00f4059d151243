use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the index constituent reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    pub symbol: String,
    pub security: String,
    /// The full GICS sector name, exactly as published.
    pub gics_sector: String,
    pub sub_industry: String,
    pub headquarters: String,
    /// The addition date cell as published (after any configured override).
    pub date_added_raw: Option<String>,
    /// The parsed addition date. `None` when the cell is empty or unreadable.
    pub date_added: Option<NaiveDate>,
    pub cik: String,
    pub founded: String,
}

/// A single trading session for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Split- and dividend-adjusted close, when the provider reports it.
    pub adj_close: Option<Decimal>,
    pub volume: u64,
}
