use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{DailyBar, ReferenceTable};

pub mod error;
pub mod responses;
pub mod wikipedia;
pub mod yahoo;

// --- Public API ---
pub use wikipedia::WikipediaClient;
pub use yahoo::YahooClient;

/// Anything that can produce the raw index constituent table.
#[async_trait]
pub trait ConstituentSource: Send + Sync {
    /// Fetches the constituent table with its headers exactly as published.
    async fn fetch_reference_table(&self) -> Result<ReferenceTable, ApiError>;
}

/// The interface for a historical daily price provider.
///
/// The collector only ever sees this trait, so tests can substitute a mock
/// that serves canned bars.
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    /// Fetches daily bars for `symbol` over `[start, end)`, oldest first.
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, ApiError>;
}
