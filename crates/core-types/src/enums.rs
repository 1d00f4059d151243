use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The eleven GICS sectors used to classify index constituents.
///
/// Variants are declared in the alphabetical order of their short codes, so the
/// derived `Ord` sorts by code (`CD` < `CS` < ... < `TC` < `UT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sector {
    ConsumerDiscretionary,
    ConsumerStaples,
    Energy,
    Financials,
    HealthCare,
    Industrials,
    InformationTechnology,
    Materials,
    RealEstate,
    CommunicationServices,
    Utilities,
}

impl Sector {
    pub const ALL: [Sector; 11] = [
        Sector::ConsumerDiscretionary,
        Sector::ConsumerStaples,
        Sector::Energy,
        Sector::Financials,
        Sector::HealthCare,
        Sector::Industrials,
        Sector::InformationTechnology,
        Sector::Materials,
        Sector::RealEstate,
        Sector::CommunicationServices,
        Sector::Utilities,
    ];

    /// The two-letter code used for column labels.
    pub fn code(&self) -> &'static str {
        match self {
            Sector::CommunicationServices => "TC",
            Sector::ConsumerDiscretionary => "CD",
            Sector::ConsumerStaples => "CS",
            Sector::Energy => "EG",
            Sector::Financials => "FN",
            Sector::HealthCare => "HC",
            Sector::Industrials => "ID",
            Sector::InformationTechnology => "IT",
            Sector::Materials => "MT",
            Sector::RealEstate => "RE",
            Sector::Utilities => "UT",
        }
    }

    /// The full GICS sector name as it appears in the reference table.
    pub fn name(&self) -> &'static str {
        match self {
            Sector::CommunicationServices => "Communication Services",
            Sector::ConsumerDiscretionary => "Consumer Discretionary",
            Sector::ConsumerStaples => "Consumer Staples",
            Sector::Energy => "Energy",
            Sector::Financials => "Financials",
            Sector::HealthCare => "Health Care",
            Sector::Industrials => "Industrials",
            Sector::InformationTechnology => "Information Technology",
            Sector::Materials => "Materials",
            Sector::RealEstate => "Real Estate",
            Sector::Utilities => "Utilities",
        }
    }

    /// Looks a sector up by its full GICS name. Surrounding whitespace is ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|sector| sector.name() == name)
    }

    /// Looks a sector up by its two-letter code.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|sector| sector.code() == code)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Sector {
    type Err = CoreError;

    /// Accepts either the full name or the short code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
            .or_else(|| Self::from_code(s))
            .ok_or_else(|| CoreError::InvalidInput("sector".to_string(), s.to_string()))
    }
}
