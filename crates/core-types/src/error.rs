use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Column '{column}' has {actual} values but the table has {expected} dates")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}
