//! Error types.

#[derive(thiserror::Error, Debug)]
pub enum WaterTrackerError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("Malformed input in {path}: {reason}")]
    MalformedInput { path: String, reason: String },
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
    #[error("Unknown analysis mode: {0}")]
    UnknownAnalysisMode(String),
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
}

impl WaterTrackerError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_anyhow() {
        let anyhow_error = anyhow!("An anyhow error");
        let error: WaterTrackerError = anyhow_error.into();
        assert_eq!(error.to_string(), "Wrapped anyhow error: An anyhow error");
    }

    #[test]
    fn malformed_input_should_name_the_file() {
        let error = WaterTrackerError::malformed("data/x.geojson", "missing `Year`");
        assert_eq!(
            error.to_string(),
            "Malformed input in data/x.geojson: missing `Year`"
        );
    }
}
