pub mod enums;
pub mod error;
pub mod structs;
pub mod table;

// Re-export the core types to provide a clean public API.
pub use enums::Sector;
pub use error::CoreError;
pub use structs::{Constituent, DailyBar};
pub use table::{ReferenceTable, WideTable};
