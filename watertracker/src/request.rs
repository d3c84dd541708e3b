use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compare::AnalysisMode;
use crate::map_frame::ChoroplethView;
use crate::metric::Metric;
use crate::view::EmptyReason;

/// A single user interaction: one selection on one of the dashboard's controls
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum ViewRequest {
    /// Choropleth for a year; the configured default year when absent
    Map {
        #[serde(default)]
        year: Option<i32>,
    },
    /// One country's forecast series for one metric
    Series { country: String, metric: Metric },
    /// Several countries for one metric under an analysis mode
    Compare {
        countries: Vec<String>,
        metric: Metric,
        #[serde(default)]
        mode: AnalysisMode,
    },
}

/// Contents of a request file: a single request or a list of them
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RequestFile {
    One(ViewRequest),
    Many(Vec<ViewRequest>),
}

impl RequestFile {
    pub fn into_requests(self) -> Vec<ViewRequest> {
        match self {
            RequestFile::One(request) => vec![request],
            RequestFile::Many(requests) => requests,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// What the client renders in response to a request
#[derive(Serialize, Debug)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum ViewResponse {
    Map(ChoroplethView),
    Chart { title: String, spec: Value },
    Message { level: MessageLevel, text: String },
}

impl ViewResponse {
    /// Reply to a request that could not be parsed or answered
    pub fn error(text: impl Into<String>) -> Self {
        ViewResponse::Message {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

impl From<EmptyReason> for ViewResponse {
    fn from(value: EmptyReason) -> Self {
        let level = match value {
            EmptyReason::NoCountriesSelected => MessageLevel::Info,
            _ => MessageLevel::Warning,
        };
        ViewResponse::Message {
            level,
            text: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_should_deserialize_with_defaults() {
        let file: RequestFile = serde_json::from_str(
            r#"[
                {"view": "map"},
                {"view": "series", "country": "World", "metric": "Population"},
                {"view": "compare", "countries": ["USA", "India"], "metric": "GDP Per Capita", "mode": "Cumulative"},
                {"view": "compare", "countries": [], "metric": "gdp"}
            ]"#,
        )
        .unwrap();
        let requests = file.into_requests();
        assert_eq!(requests[0], ViewRequest::Map { year: None });
        assert_eq!(
            requests[2],
            ViewRequest::Compare {
                countries: vec!["USA".into(), "India".into()],
                metric: Metric::GdpPerCapita,
                mode: AnalysisMode::Cumulative,
            }
        );
        assert!(matches!(
            requests[3],
            ViewRequest::Compare {
                mode: AnalysisMode::Nominal,
                ..
            }
        ));
    }

    #[test]
    fn single_request_file_should_parse() {
        let file: RequestFile = serde_json::from_str(r#"{"view": "map", "year": 2001}"#).unwrap();
        assert_eq!(file.into_requests(), vec![ViewRequest::Map { year: Some(2001) }]);
    }

    #[test]
    fn unknown_metric_should_fail_to_parse() {
        let result = serde_json::from_str::<ViewRequest>(
            r#"{"view": "series", "country": "World", "metric": "Rainfall"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_reason_should_become_a_message() {
        let response: ViewResponse = EmptyReason::NoCountriesSelected.into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "view": "message",
                "level": "info",
                "text": "Please select at least one country to display the data."
            })
        );
    }
}
