use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Failed to assemble price table: {0}")]
    Table(#[from] core_types::CoreError),

    #[error("Invalid collector settings: {0}")]
    InvalidSettings(String),
}
