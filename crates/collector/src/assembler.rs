use crate::error::CollectorError;
use crate::{SkippedSymbol, SymbolOutcome};
use api_client::PriceHistorySource;
use chrono::NaiveDate;
use configuration::HistorySettings;
use core_types::{DailyBar, Sector, WideTable};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use universe::Universe;

/// The three closing-price tables plus the symbols that did not make it in.
///
/// All three tables share the same date index and column order; they differ
/// only in how columns are labelled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClosingPrices {
    /// One column per symbol, labelled with the symbol.
    pub by_symbol: WideTable,
    /// One column per symbol, labelled with its sector code.
    pub by_sector: WideTable,
    /// One column per symbol, labelled `SYMBOL_CODE`.
    pub by_symbol_sector: WideTable,
    /// Symbols whose history does not reach back to the first session.
    pub late_listed: Vec<SkippedSymbol>,
    /// Symbols with no usable history at all.
    pub unavailable: Vec<SkippedSymbol>,
}

impl ClosingPrices {
    /// Symbols that made it into the tables, in column order.
    pub fn included(&self) -> &[String] {
        &self.by_symbol.columns
    }
}

/// Downloads closing prices for every symbol of the universe and assembles
/// them into date-aligned tables.
///
/// Symbols are visited in `universe.symbols()` order. Up to
/// `settings.concurrency` requests run at once, but results are consumed in
/// order, so column order is deterministic. `observer` is called once per
/// symbol as soon as its outcome is known.
pub async fn collect_closing_prices<F>(
    source: &dyn PriceHistorySource,
    universe: &Universe,
    settings: &HistorySettings,
    mut observer: F,
) -> Result<ClosingPrices, CollectorError>
where
    F: FnMut(&SymbolOutcome),
{
    if settings.concurrency == 0 {
        return Err(CollectorError::InvalidSettings(
            "concurrency must be at least 1".to_string(),
        ));
    }

    let (start, end) = (settings.start, settings.end);
    let mut fetches = stream::iter(universe.symbols())
        .map(|symbol| async move { (symbol, source.fetch_daily_bars(symbol, start, end).await) })
        .buffered(settings.concurrency);

    let mut builder = TableBuilder::default();
    let mut prices = ClosingPrices::default();

    while let Some((symbol, result)) = fetches.next().await {
        let outcome = match (result, universe.sector_of(symbol)) {
            (Err(e), _) => unavailable(symbol, e.to_string()),
            (Ok(_), None) => unavailable(symbol, "no sector assignment".to_string()),
            (Ok(bars), Some(_)) if bars.is_empty() => {
                unavailable(symbol, "no history in range".to_string())
            }
            (Ok(bars), Some(sector)) => {
                let first_session = bars[0].date;
                if first_session > settings.first_session {
                    tracing::info!(%symbol, %first_session, "Not in past, skipping.");
                    SymbolOutcome::LateListed {
                        symbol: symbol.to_string(),
                        first_session,
                    }
                } else {
                    builder.add(symbol, sector, &bars, settings.adjusted)?;
                    SymbolOutcome::Included {
                        symbol: symbol.to_string(),
                        sessions: bars.len(),
                    }
                }
            }
        };

        match &outcome {
            SymbolOutcome::Unavailable { symbol, reason } => {
                tracing::warn!(%symbol, %reason, "Delisted or unavailable, skipping.");
                prices.unavailable.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: reason.clone(),
                });
            }
            SymbolOutcome::LateListed {
                symbol,
                first_session,
            } => prices.late_listed.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: format!("first session {}", first_session),
            }),
            SymbolOutcome::Included { .. } => {}
        }
        observer(&outcome);
    }

    let (by_symbol, by_sector, by_symbol_sector) = builder.finish();
    prices.by_symbol = by_symbol;
    prices.by_sector = by_sector;
    prices.by_symbol_sector = by_symbol_sector;

    tracing::info!(
        included = prices.by_symbol.width(),
        sessions = prices.by_symbol.height(),
        late_listed = prices.late_listed.len(),
        unavailable = prices.unavailable.len(),
        "Closing prices assembled."
    );
    Ok(prices)
}

fn unavailable(symbol: &str, reason: String) -> SymbolOutcome {
    SymbolOutcome::Unavailable {
        symbol: symbol.to_string(),
        reason,
    }
}

/// Accumulates columns against the date index fixed by the first symbol.
#[derive(Default)]
struct TableBuilder {
    positions: HashMap<NaiveDate, usize>,
    tables: Option<(WideTable, WideTable, WideTable)>,
}

impl TableBuilder {
    fn add(
        &mut self,
        symbol: &str,
        sector: Sector,
        bars: &[DailyBar],
        adjusted: bool,
    ) -> Result<(), CollectorError> {
        if self.tables.is_none() {
            let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
            self.positions = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
            self.tables = Some((
                WideTable::new(dates.clone()),
                WideTable::new(dates.clone()),
                WideTable::new(dates),
            ));
        }

        let column = self.align(symbol, bars, adjusted);
        if let Some((by_symbol, by_sector, by_symbol_sector)) = self.tables.as_mut() {
            by_symbol.push_column(symbol, column.clone())?;
            by_sector.push_column(sector.code(), column.clone())?;
            by_symbol_sector.push_column(format!("{}_{}", symbol, sector.code()), column)?;
        }
        Ok(())
    }

    /// Places each close at its date's row; dates outside the index are dropped.
    fn align(&self, symbol: &str, bars: &[DailyBar], adjusted: bool) -> Vec<Option<Decimal>> {
        let mut column = vec![None; self.positions.len()];
        let mut dropped = 0usize;
        for bar in bars {
            match self.positions.get(&bar.date) {
                Some(&row) => column[row] = Some(closing_price(bar, adjusted)),
                None => dropped += 1,
            }
        }
        let missing = column.iter().filter(|v| v.is_none()).count();
        if dropped > 0 || missing > 0 {
            tracing::debug!(%symbol, dropped, missing, "Sessions differ from the date index.");
        }
        column
    }

    fn finish(self) -> (WideTable, WideTable, WideTable) {
        self.tables.unwrap_or_default()
    }
}

fn closing_price(bar: &DailyBar, adjusted: bool) -> Decimal {
    match bar.adj_close {
        Some(adj_close) if adjusted => adj_close,
        _ => bar.close,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::error::ApiError;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use universe::SectorAssignment;

    // --- Mock Price Source ---
    struct MockSource {
        histories: HashMap<String, Result<Vec<DailyBar>, String>>,
        requested: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn new(histories: Vec<(&str, Result<Vec<DailyBar>, String>)>) -> Self {
            Self {
                histories: histories
                    .into_iter()
                    .map(|(s, h)| (s.to_string(), h))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PriceHistorySource for MockSource {
        async fn fetch_daily_bars(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<DailyBar>, ApiError> {
            self.requested.lock().unwrap().push(symbol.to_string());
            match self.histories.get(symbol) {
                Some(Ok(bars)) => Ok(bars.clone()),
                Some(Err(msg)) => Err(ApiError::Provider(msg.clone())),
                None => Err(ApiError::Provider("Not Found".to_string())),
            }
        }
    }

    // --- Helpers ---
    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, d).unwrap()
    }

    fn bars(days: &[u32], closes: &[Decimal]) -> Vec<DailyBar> {
        days.iter()
            .zip(closes)
            .map(|(d, c)| DailyBar {
                date: day(*d),
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                adj_close: None,
                volume: 100,
            })
            .collect()
    }

    fn universe_of(entries: &[(&str, Sector)]) -> Universe {
        Universe {
            constituents: Vec::new(),
            assignments: entries
                .iter()
                .map(|(s, sector)| SectorAssignment {
                    symbol: s.to_string(),
                    sector: *sector,
                })
                .collect(),
            unclassified: Vec::new(),
        }
    }

    fn settings() -> HistorySettings {
        HistorySettings {
            start: day(1),
            end: day(31),
            first_session: day(3),
            concurrency: 2,
            adjusted: true,
        }
    }

    #[tokio::test]
    async fn builds_three_aligned_tables() {
        let source = MockSource::new(vec![
            ("CVX", Ok(bars(&[3, 4, 5], &[dec!(10), dec!(11), dec!(12)]))),
            ("XOM", Ok(bars(&[3, 4, 5], &[dec!(20), dec!(21), dec!(22)]))),
            ("DUK", Ok(bars(&[3, 4, 5], &[dec!(30), dec!(31), dec!(32)]))),
        ]);
        let universe = universe_of(&[
            ("CVX", Sector::Energy),
            ("XOM", Sector::Energy),
            ("DUK", Sector::Utilities),
        ]);

        let prices = collect_closing_prices(&source, &universe, &settings(), |_| {})
            .await
            .unwrap();

        assert_eq!(prices.by_symbol.columns, vec!["CVX", "XOM", "DUK"]);
        assert_eq!(prices.by_sector.columns, vec!["EG", "EG", "UT"]);
        assert_eq!(prices.by_symbol_sector.columns, vec!["CVX_EG", "XOM_EG", "DUK_UT"]);
        assert_eq!(prices.by_symbol.dates, vec![day(3), day(4), day(5)]);
        assert_eq!(prices.by_sector.values[1], vec![Some(dec!(20)), Some(dec!(21)), Some(dec!(22))]);
        assert_eq!(prices.by_symbol.values, prices.by_symbol_sector.values);
        assert!(prices.late_listed.is_empty());
        assert!(prices.unavailable.is_empty());
    }

    #[tokio::test]
    async fn late_listed_and_unavailable_are_separated() {
        let source = MockSource::new(vec![
            ("OLD", Ok(bars(&[3, 4], &[dec!(1), dec!(2)]))),
            ("NEW", Ok(bars(&[4], &[dec!(5)]))),
            ("GONE", Err("No data found, symbol may be delisted".to_string())),
            ("EMPTY", Ok(Vec::new())),
        ]);
        let universe = universe_of(&[
            ("OLD", Sector::Materials),
            ("NEW", Sector::Materials),
            ("GONE", Sector::Materials),
            ("EMPTY", Sector::Materials),
        ]);

        let mut seen = Vec::new();
        let prices = collect_closing_prices(&source, &universe, &settings(), |outcome| {
            seen.push(outcome.symbol().to_string())
        })
        .await
        .unwrap();

        assert_eq!(prices.included(), ["OLD".to_string()]);
        assert_eq!(prices.late_listed.len(), 1);
        assert_eq!(prices.late_listed[0].symbol, "NEW");
        let unavailable: Vec<&str> = prices.unavailable.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(unavailable, vec!["GONE", "EMPTY"]);
        assert!(prices.unavailable[0].reason.contains("delisted"));
        assert_eq!(seen, vec!["OLD", "NEW", "GONE", "EMPTY"]);
        assert_eq!(source.requested.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn later_symbols_align_to_first_symbol_dates() {
        let source = MockSource::new(vec![
            ("A", Ok(bars(&[3, 4, 5], &[dec!(1), dec!(2), dec!(3)]))),
            // Missing the 4th, has an extra session on the 6th.
            ("B", Ok(bars(&[3, 5, 6], &[dec!(7), dec!(8), dec!(9)]))),
        ]);
        let universe = universe_of(&[("A", Sector::HealthCare), ("B", Sector::HealthCare)]);

        let prices = collect_closing_prices(&source, &universe, &settings(), |_| {})
            .await
            .unwrap();

        assert_eq!(prices.by_symbol.height(), 3);
        assert_eq!(prices.by_symbol.values[1], vec![Some(dec!(7)), None, Some(dec!(8))]);
    }

    #[tokio::test]
    async fn nothing_included_gives_empty_tables() {
        let source = MockSource::new(vec![]);
        let universe = universe_of(&[("ZZZ", Sector::RealEstate)]);

        let prices = collect_closing_prices(&source, &universe, &settings(), |_| {})
            .await
            .unwrap();

        assert!(prices.by_symbol.is_empty());
        assert_eq!(prices.by_sector.height(), 0);
        assert_eq!(prices.unavailable.len(), 1);
    }

    #[tokio::test]
    async fn zero_concurrency_is_rejected() {
        let source = MockSource::new(vec![]);
        let mut settings = settings();
        settings.concurrency = 0;
        let err = collect_closing_prices(&source, &universe_of(&[]), &settings, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::InvalidSettings(_)));
    }

    #[tokio::test]
    async fn tables_use_adjusted_closes() {
        let mut split = bars(&[3, 4], &[dec!(10), dec!(12)]);
        split[0].adj_close = Some(dec!(5));
        split[1].adj_close = Some(dec!(6));
        let source = MockSource::new(vec![("AAPL", Ok(split))]);
        let universe = universe_of(&[("AAPL", Sector::InformationTechnology)]);

        let prices = collect_closing_prices(&source, &universe, &settings(), |_| {})
            .await
            .unwrap();
        assert_eq!(prices.by_symbol.values[0], vec![Some(dec!(5)), Some(dec!(6))]);
        assert_eq!(prices.by_sector.values[0], vec![Some(dec!(5)), Some(dec!(6))]);
        assert_eq!(prices.by_symbol_sector.values[0], vec![Some(dec!(5)), Some(dec!(6))]);

        let mut raw = settings();
        raw.adjusted = false;
        let prices = collect_closing_prices(&source, &universe, &raw, |_| {})
            .await
            .unwrap();
        assert_eq!(prices.by_symbol.values[0], vec![Some(dec!(10)), Some(dec!(12))]);
    }

    #[tokio::test]
    async fn missing_adjusted_close_falls_back_to_close() {
        let mut history = bars(&[3, 4], &[dec!(10), dec!(12)]);
        history[1].adj_close = Some(dec!(6));
        let source = MockSource::new(vec![("PG", Ok(history))]);
        let universe = universe_of(&[("PG", Sector::ConsumerStaples)]);

        let prices = collect_closing_prices(&source, &universe, &settings(), |_| {})
            .await
            .unwrap();
        assert_eq!(prices.by_symbol.values[0], vec![Some(dec!(10)), Some(dec!(6))]);
    }

    // --- Source whose earlier symbols answer last ---
    struct SlowFirstSource {
        delays_ms: HashMap<String, u64>,
        finished: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PriceHistorySource for SlowFirstSource {
        async fn fetch_daily_bars(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<DailyBar>, ApiError> {
            let delay = self.delays_ms.get(symbol).copied().unwrap_or(0);
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            self.finished.lock().unwrap().push(symbol.to_string());
            Ok(bars(&[3, 4], &[dec!(1), dec!(2)]))
        }
    }

    #[tokio::test]
    async fn out_of_order_completion_keeps_symbol_order() {
        let source = SlowFirstSource {
            delays_ms: HashMap::from([
                ("A".to_string(), 300),
                ("B".to_string(), 150),
                ("C".to_string(), 0),
            ]),
            finished: Mutex::new(Vec::new()),
        };
        let universe = universe_of(&[
            ("A", Sector::Financials),
            ("B", Sector::Financials),
            ("C", Sector::Financials),
        ]);
        let mut settings = settings();
        settings.concurrency = 3;

        let mut seen = Vec::new();
        let prices = collect_closing_prices(&source, &universe, &settings, |outcome| {
            seen.push(outcome.symbol().to_string())
        })
        .await
        .unwrap();

        assert_eq!(*source.finished.lock().unwrap(), vec!["C", "B", "A"]);
        assert_eq!(prices.by_symbol.columns, vec!["A", "B", "C"]);
        assert_eq!(prices.by_symbol_sector.columns, vec!["A_FN", "B_FN", "C_FN"]);
        assert_eq!(seen, vec!["A", "B", "C"]);
    }
}
