use serde::Serialize;

pub mod assembler;
pub mod error;

pub use assembler::{ClosingPrices, collect_closing_prices};
pub use error::CollectorError;

/// What happened to one symbol during collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SymbolOutcome {
    /// The symbol contributed a column to every table.
    Included { symbol: String, sessions: usize },
    /// The symbol's history starts after the first session of the window.
    LateListed {
        symbol: String,
        first_session: chrono::NaiveDate,
    },
    /// No usable history could be fetched (delisted, renamed, provider error).
    Unavailable { symbol: String, reason: String },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Included { symbol, .. }
            | SymbolOutcome::LateListed { symbol, .. }
            | SymbolOutcome::Unavailable { symbol, .. } => symbol,
        }
    }
}

/// A symbol that could not be collected, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}
