use crate::error::ConfigError;
use crate::settings::Config;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    CandleSettings, CorrelationSettings, DateOverride, HistorySettings, HttpSettings,
    LabelAnchor, LoggingSettings, OutputSettings, UniverseSettings,
};

/// Environment variables with this prefix override file settings,
/// e.g. `MERIDIAN__HISTORY__END=2023-01-01`.
pub const ENV_PREFIX: &str = "MERIDIAN";

/// Loads the application configuration from `config.toml` in the working directory.
///
/// The file is optional: any setting it omits keeps its default. Environment
/// variables are layered on top, and the result is validated.
pub fn load_config() -> Result<Config, ConfigError> {
    build(config::File::with_name("config").required(false))
}

/// Loads the application configuration from an explicit file, which must exist.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    build(config::File::from(path).required(true))
}

fn build(
    file: config::File<config::FileSourceFile, config::FileFormat>,
) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}
