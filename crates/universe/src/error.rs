use thiserror::Error;

#[derive(Error, Debug)]
pub enum UniverseError {
    #[error("The constituent table has no '{0}' column")]
    MissingColumn(String),

    #[error("Row {row} has no value for '{column}'")]
    MissingValue { row: usize, column: String },
}
