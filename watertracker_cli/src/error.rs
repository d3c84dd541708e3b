use polars::error::PolarsError;
use watertracker::error::WaterTrackerError;

#[derive(thiserror::Error, Debug)]
pub enum WaterTrackerCliError {
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("serde JSON error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("watertracker error: {0}")]
    WaterTrackerError(#[from] WaterTrackerError),
    #[error("invalid TOML in config file: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("output format {format} is not available for `{command}`")]
    UnsupportedFormat {
        format: String,
        command: &'static str,
    },
}

pub type WaterTrackerCliResult<T> = Result<T, WaterTrackerCliError>;
