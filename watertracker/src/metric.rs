//! The fixed catalogue of metrics that can be charted, with their labels, keys and colours.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString};

use crate::error::WaterTrackerError;
use crate::COL;

/// A chartable metric. Parses from its label, its forecast key or a short name, ignoring ASCII
/// case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum Metric {
    #[strum(
        serialize = "freshwater",
        serialize = "Freshwater_Resources_Per_Capita_m3",
        serialize = "Freshwater Resources Per Capita (m³)",
        serialize = "Freshwater Resources Per Capita"
    )]
    FreshwaterResourcesPerCapita,
    #[strum(
        serialize = "use",
        serialize = "Annual_Freshwater_Use",
        serialize = "Annual Freshwater Use (m³)",
        serialize = "Annual Freshwater Use"
    )]
    AnnualFreshwaterUse,
    #[strum(
        serialize = "population",
        serialize = "Historical_Population"
    )]
    Population,
    #[strum(
        serialize = "gdp",
        serialize = "GDP_Per_Capita",
        serialize = "GDP Per Capita ($) PPP",
        serialize = "GDP Per Capita"
    )]
    GdpPerCapita,
}

impl Metric {
    /// Every metric in display order
    pub fn catalog() -> impl Iterator<Item = Metric> {
        Metric::iter()
    }

    /// Human readable label shown in selectors and chart titles
    pub fn label(&self) -> &'static str {
        match self {
            Metric::FreshwaterResourcesPerCapita => "Freshwater Resources Per Capita (m³)",
            Metric::AnnualFreshwaterUse => "Annual Freshwater Use (m³)",
            Metric::Population => "Population",
            Metric::GdpPerCapita => "GDP Per Capita ($) PPP",
        }
    }

    /// Key of the metric in the forecast file
    pub fn key(&self) -> &'static str {
        match self {
            Metric::FreshwaterResourcesPerCapita => COL::FRESHWATER_RESOURCES_PER_CAPITA_M3,
            Metric::AnnualFreshwaterUse => COL::ANNUAL_FRESHWATER_USE,
            Metric::Population => "Historical_Population",
            Metric::GdpPerCapita => COL::GDP_PER_CAPITA,
        }
    }

    /// Column of the metric in the country-year records
    pub fn record_column(&self) -> &'static str {
        match self {
            Metric::FreshwaterResourcesPerCapita => COL::FRESHWATER_RESOURCES_PER_CAPITA_M3,
            Metric::AnnualFreshwaterUse => COL::ANNUAL_FRESHWATER_USE,
            Metric::Population => COL::POPULATION,
            Metric::GdpPerCapita => COL::GDP_PER_CAPITA,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Metric::FreshwaterResourcesPerCapita => "steelblue",
            Metric::AnnualFreshwaterUse => "darkorange",
            Metric::Population => "firebrick",
            Metric::GdpPerCapita => "mediumpurple",
        }
    }

    /// Name accepted on the command line
    pub fn short_name(&self) -> &'static str {
        match self {
            Metric::FreshwaterResourcesPerCapita => "freshwater",
            Metric::AnnualFreshwaterUse => "use",
            Metric::Population => "population",
            Metric::GdpPerCapita => "gdp",
        }
    }

    /// Resolve a metric from any accepted spelling, reporting unknown names as an error
    pub fn resolve(value: &str) -> Result<Self, WaterTrackerError> {
        Metric::from_str(value.trim()).map_err(|_| WaterTrackerError::UnknownMetric(value.into()))
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl TryFrom<String> for Metric {
    type Error = WaterTrackerError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Metric::resolve(&value)
    }
}

impl From<Metric> for String {
    fn from(value: Metric) -> Self {
        value.label().to_string()
    }
}
