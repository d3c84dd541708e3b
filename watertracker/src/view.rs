use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// Outcome of a selection. An empty selection is not an error: it carries the reason so the
/// caller can show an informational message instead of a chart.
#[derive(Debug)]
pub enum View<T> {
    Data(T),
    Empty(EmptyReason),
}

impl<T> View<T> {
    pub fn data(self) -> Option<T> {
        match self {
            View::Data(data) => Some(data),
            View::Empty(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, View::Empty(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum EmptyReason {
    NoDataForYear { year: i32 },
    NoSeries { country: String, metric: Metric },
    NoCountriesSelected,
}

impl Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyReason::NoDataForYear { year } => write!(f, "No data available for {year}."),
            EmptyReason::NoSeries { country, metric } => {
                write!(f, "No predictions available for {metric} in {country}.")
            }
            EmptyReason::NoCountriesSelected => {
                write!(f, "Please select at least one country to display the data.")
            }
        }
    }
}
