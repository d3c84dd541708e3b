use anyhow::Result;
use compare::{AnalysisMode, Comparison};
use log::debug;
use map_frame::MapFrame;
use metric::Metric;
use request::{ViewRequest, ViewResponse};
use series::CountrySeries;
use store::DataStore;
use view::View;

use crate::config::Config;

// Re-exports
pub use column_names as COL;

// Modules
pub mod chart;
pub mod column_names;
pub mod compare;
pub mod config;
pub mod data_source;
pub mod error;
pub mod formatters;
pub mod geo;
pub mod map_frame;
pub mod metric;
pub mod request;
pub mod search;
pub mod series;
pub mod store;
pub mod view;

/// Type for the loaded water scarcity data and the views derived from it
pub struct WaterTracker {
    pub store: DataStore,
    pub config: Config,
}

impl WaterTracker {
    /// Setup the WaterTracker object with default configuration
    pub fn new() -> Result<Self> {
        Self::new_with_config(Config::default())
    }

    /// Setup the WaterTracker object with custom configuration, loading both inputs
    pub fn new_with_config(config: Config) -> Result<Self> {
        debug!("config: {config:?}");
        let store = DataStore::load(&config)?;
        Ok(Self { store, config })
    }

    /// Wrap an already loaded store
    pub fn from_store(store: DataStore, config: Config) -> Self {
        Self { store, config }
    }

    /// Choropleth frame for `year`
    pub fn map(&self, year: i32) -> Result<MapFrame> {
        map_frame::build_map_frame(&self.store, year, self.config.freshwater_cap)
    }

    /// Forecast series of one country
    pub fn series(&self, country: &str, metric: Metric) -> Result<View<CountrySeries>> {
        series::select_series(&self.store, country, metric)
    }

    /// Comparison of several countries, split at the configured boundary year
    pub fn compare(
        &self,
        countries: &[String],
        metric: Metric,
        mode: AnalysisMode,
    ) -> Result<View<Comparison>> {
        compare::compare_countries(&self.store, countries, metric, mode, self.config.boundary_year)
    }

    /// Answer one request with the view the client should render
    pub fn handle(&self, request: ViewRequest) -> Result<ViewResponse> {
        debug!("handling {request:?}");
        let response = match request {
            ViewRequest::Map { year } => {
                let year = year.unwrap_or(self.config.default_year);
                ViewResponse::Map(self.map(year)?.to_view()?)
            }
            ViewRequest::Series { country, metric } => match self.series(&country, metric)? {
                View::Data(series) => ViewResponse::Chart {
                    title: format!("{metric} Predictions Over Time for {}", series.country),
                    spec: chart::series_chart(&series)?,
                },
                View::Empty(reason) => reason.into(),
            },
            ViewRequest::Compare {
                countries,
                metric,
                mode,
            } => match self.compare(&countries, metric, mode)? {
                View::Data(comparison) => ViewResponse::Chart {
                    title: format!("Comparison of {metric} Over Time ({mode})"),
                    spec: chart::comparison_chart(
                        &comparison,
                        self.config.forecast_horizon_year,
                    )?,
                },
                View::Empty(reason) => reason.into(),
            },
        };
        Ok(response)
    }
}
