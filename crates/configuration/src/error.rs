use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read, or a file or `MERIDIAN__*` value did not
    /// deserialize into the expected type.
    #[error("Failed to load configuration from file or environment: {0}")]
    LoadError(#[from] config::ConfigError),

    /// The settings parsed but describe an unusable run.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
