//! # Universe Selection
//!
//! Turns the raw index constituent table into the ordered list of symbols the
//! collector will download, along with each symbol's sector.
//!
//! ## Selection rules
//!
//! - Headers are normalized (`"Date added"` -> `"date_added"`).
//! - Configured date overrides replace the published addition date.
//! - Constituents added before the cutoff are kept, followed by those whose
//!   addition date is unknown.
//! - Symbols are grouped by sector code, keeping the earlier-added symbols
//!   first within a sector.

use core_types::{Constituent, Sector};
use serde::Serialize;

pub mod error;
pub mod selection;

pub use error::UniverseError;
pub use selection::{parse_added_date, select_universe};

/// The sector a selected symbol belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorAssignment {
    pub symbol: String,
    pub sector: Sector,
}

/// The outcome of constituent selection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Universe {
    /// Selected constituents, grouped by full sector name.
    pub constituents: Vec<Constituent>,
    /// Symbol -> sector lookup, ordered by sector code. This order drives the
    /// column order of every price table.
    pub assignments: Vec<SectorAssignment>,
    /// Selected symbols whose sector name is not one of the known GICS sectors.
    pub unclassified: Vec<String>,
}

impl Universe {
    /// The symbols to download, in table column order.
    pub fn symbols(&self) -> Vec<&str> {
        self.assignments.iter().map(|a| a.symbol.as_str()).collect()
    }

    pub fn sector_of(&self, symbol: &str) -> Option<Sector> {
        self.assignments
            .iter()
            .find(|a| a.symbol == symbol)
            .map(|a| a.sector)
    }

    pub fn constituent(&self, symbol: &str) -> Option<&Constituent> {
        self.constituents.iter().find(|c| c.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
