use crate::error::AnalyticsError;
use core_types::DailyBar;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;
use ta::Next;
use ta::indicators::SimpleMovingAverage as Sma;

/// Decimal places kept on averaged prices.
const AVERAGE_SCALE: u32 = 6;

/// A simple moving average of closes, aligned with the bars it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverage {
    pub window: usize,
    /// `None` until `window` sessions are available.
    pub values: Vec<Option<Decimal>>,
}

/// OHLCV bars for one symbol together with their moving averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleSeries {
    pub symbol: String,
    pub bars: Vec<DailyBar>,
    pub averages: Vec<MovingAverage>,
}

/// Simple moving average over a trailing window.
pub fn moving_average(values: &[Decimal], window: usize) -> Result<Vec<Option<Decimal>>, AnalyticsError> {
    if window == 0 {
        return Err(AnalyticsError::InvalidWindow(window));
    }
    let mut sma = Sma::new(window).map_err(|_| AnalyticsError::InvalidWindow(window))?;

    let mut out = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        let average = sma.next(value.to_f64().unwrap_or_default());
        if i + 1 >= window {
            out.push(Decimal::from_f64(average).map(|d| d.round_dp(AVERAGE_SCALE)));
        } else {
            out.push(None);
        }
    }

    Ok(out)
}

/// Builds the candlestick data for one symbol: its bars plus one moving
/// average of the close per requested window.
pub fn candle_series(
    symbol: &str,
    bars: Vec<DailyBar>,
    windows: &[usize],
) -> Result<CandleSeries, AnalyticsError> {
    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    let averages = windows
        .iter()
        .map(|&window| {
            Ok(MovingAverage {
                window,
                values: moving_average(&closes, window)?,
            })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    Ok(CandleSeries {
        symbol: symbol.to_string(),
        bars,
        averages,
    })
}
