use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed table file: {0}")]
    Format(String),

    #[error("Failed to rebuild table: {0}")]
    Table(#[from] core_types::CoreError),
}
