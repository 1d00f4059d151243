use crate::PriceHistorySource;
use crate::error::ApiError;
use crate::responses::{ChartEnvelope, ChartResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use configuration::HttpSettings;
use core_types::DailyBar;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::time::Duration;

/// Decimal places kept when converting the provider's floating point prices.
const PRICE_SCALE: u32 = 6;

/// A `PriceHistorySource` backed by the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(http: &HttpSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.clone())
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: http.chart_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceHistorySource for YahooClient {
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, ApiError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, provider_symbol(symbol));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", unix_midnight(start).to_string()),
                ("period2", unix_midnight(end).to_string()),
                ("interval", "1d".to_string()),
                ("includeAdjustedClose", "true".to_string()),
                ("events", "div,split".to_string()),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // Not-found symbols come back as a non-2xx status with a regular chart
        // envelope whose `error` field explains why.
        match serde_json::from_str::<ChartEnvelope>(&text) {
            Ok(envelope) => parse_chart(envelope),
            Err(_) if !status.is_success() => Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            }),
            Err(e) => Err(ApiError::Deserialization(e.to_string())),
        }
    }
}

/// Converts an index ticker into the provider's notation (`BRK.B` -> `BRK-B`).
pub fn provider_symbol(symbol: &str) -> String {
    symbol.trim().replace('.', "-")
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Turns a chart envelope into bars, oldest first.
///
/// Sessions with no close are skipped. Other missing prices fall back to the
/// close so a bar is never partially empty.
pub fn parse_chart(envelope: ChartEnvelope) -> Result<Vec<DailyBar>, ApiError> {
    if let Some(error) = envelope.chart.error {
        return Err(ApiError::Provider(format!("{}: {}", error.code, error.description)));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ApiError::Provider("Chart response has no result".to_string()))?;

    bars_from_result(result)
}

fn bars_from_result(result: ChartResult) -> Result<Vec<DailyBar>, ApiError> {
    let ChartResult {
        meta,
        timestamp,
        indicators,
    } = result;

    if timestamp.is_empty() {
        return Ok(Vec::new());
    }

    let quote = indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = indicators
        .adjclose
        .into_iter()
        .next()
        .unwrap_or_default()
        .adjclose;

    let mut bars = Vec::with_capacity(timestamp.len());
    for (i, ts) in timestamp.iter().enumerate() {
        let Some(close) = at(&quote.close, i) else {
            tracing::debug!(symbol = %meta.symbol, timestamp = ts, "Skipping session without close.");
            continue;
        };

        let local = DateTime::from_timestamp(ts + meta.gmtoffset, 0)
            .ok_or_else(|| ApiError::InvalidData(format!("Invalid timestamp: {}", ts)))?;

        bars.push(DailyBar {
            date: local.date_naive(),
            open: price(at(&quote.open, i).unwrap_or(close))?,
            high: price(at(&quote.high, i).unwrap_or(close))?,
            low: price(at(&quote.low, i).unwrap_or(close))?,
            close: price(close)?,
            adj_close: at(&adjclose, i).map(price).transpose()?,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
        });
    }

    bars.sort_by_key(|bar| bar.date);
    bars.dedup_by_key(|bar| bar.date);
    Ok(bars)
}

fn at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten()
}

fn price(value: f64) -> Result<Decimal, ApiError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(PRICE_SCALE))
        .ok_or_else(|| ApiError::InvalidData(format!("Price is not a finite number: {}", value)))
}
