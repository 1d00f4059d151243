use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; missing sections fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub universe: UniverseSettings,
    pub history: HistorySettings,
    pub candles: CandleSettings,
    pub correlation: CorrelationSettings,
    pub http: HttpSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

impl Config {
    /// Rejects settings that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.start >= self.history.end {
            return Err(ConfigError::ValidationError(format!(
                "history.start ({}) must be before history.end ({})",
                self.history.start, self.history.end
            )));
        }
        if self.history.first_session < self.history.start {
            return Err(ConfigError::ValidationError(format!(
                "history.first_session ({}) must not precede history.start ({})",
                self.history.first_session, self.history.start
            )));
        }
        if self.history.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "history.concurrency must be at least 1".to_string(),
            ));
        }
        if self.candles.start >= self.candles.end {
            return Err(ConfigError::ValidationError(format!(
                "candles.start ({}) must be before candles.end ({})",
                self.candles.start, self.candles.end
            )));
        }
        if self.candles.moving_averages.iter().any(|w| *w == 0) {
            return Err(ConfigError::ValidationError(
                "candles.moving_averages must not contain a zero window".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Controls which index constituents are selected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UniverseSettings {
    /// The page holding the constituent table.
    pub source_url: String,
    /// Which `<table>` on the page to read (0-based).
    pub table_index: usize,
    /// Constituents added strictly before this date are selected.
    pub added_before: NaiveDate,
    /// Whether constituents with no known addition date are selected too.
    pub include_undated: bool,
    /// Corrections applied to the published addition dates before filtering.
    pub date_overrides: Vec<DateOverride>,
}

/// Replaces the published addition date of one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DateOverride {
    pub symbol: String,
    pub date: NaiveDate,
}

impl Default for UniverseSettings {
    fn default() -> Self {
        Self {
            source_url: "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies".to_string(),
            table_index: 0,
            added_before: ymd(2000, 1, 1),
            include_undated: true,
            // AT&T lists two dates in one cell.
            date_overrides: vec![DateOverride {
                symbol: "T".to_string(),
                date: ymd(1983, 11, 30),
            }],
        }
    }
}

/// The closing-price download window.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub start: NaiveDate,
    /// Exclusive upper bound.
    pub end: NaiveDate,
    /// A symbol is kept only if its first bar falls on or before this date.
    pub first_session: NaiveDate,
    /// Maximum number of history requests in flight at once.
    pub concurrency: usize,
    /// Fill the tables with split- and dividend-adjusted closes. Sessions
    /// without an adjusted close fall back to the raw close.
    pub adjusted: bool,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            start: ymd(2000, 1, 1),
            end: ymd(2022, 6, 1),
            first_session: ymd(2000, 1, 3),
            concurrency: 4,
            adjusted: true,
        }
    }
}

/// The single-symbol OHLCV export.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CandleSettings {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Simple moving average windows, in sessions.
    pub moving_averages: Vec<usize>,
}

impl Default for CandleSettings {
    fn default() -> Self {
        Self {
            start: ymd(2000, 1, 1),
            end: ymd(2022, 1, 1),
            moving_averages: vec![3, 6, 9],
        }
    }
}

/// Where sector labels sit along a correlation matrix axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LabelAnchor {
    /// At the first column of each sector.
    #[default]
    Start,
    /// In the middle of each sector's run of columns.
    Center,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorrelationSettings {
    pub anchor: LabelAnchor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub chart_base_url: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("meridian/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            chart_base_url: "https://query1.finance.yahoo.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive, used when `RUST_LOG` is unset.
    pub level: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
