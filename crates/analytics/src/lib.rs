//! # Meridian Analytics
//!
//! Numeric summaries of the assembled price tables: the data that sits behind
//! a correlation heatmap and a candlestick chart, without drawing either.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** This crate has no knowledge of external systems. It
//!   depends only on `core-types` and the settings types in `configuration`.
//! - **Stateless Calculation:** every function takes tables or bars and returns
//!   a new value.
//!
//! ## Public API
//!
//! - `correlation_matrix`: pairwise Pearson correlation between table columns.
//! - `label_positions`: where each sector code belongs along a matrix axis.
//! - `moving_average` / `candle_series`: simple moving averages over closes.

// Declare the modules that constitute this crate.
pub mod averages;
pub mod correlation;
pub mod error;
pub mod labels;

// Re-export the key components to create a clean, public-facing API.
pub use averages::{CandleSeries, MovingAverage, candle_series, moving_average};
pub use correlation::{CorrelationMatrix, correlation_matrix, pearson};
pub use error::AnalyticsError;
pub use labels::{LabelPosition, label_positions};
