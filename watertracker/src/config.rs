use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// GeoJSON file of per-country, per-year polygons and attributes
    pub geo_data_path: String,
    /// JSON file of precomputed forecasts keyed by country then metric
    pub predictions_path: String,
    /// First selectable year of the map
    pub min_year: i32,
    /// Year the map opens on
    pub default_year: i32,
    /// Ceiling applied to freshwater per capita before binning
    pub freshwater_cap: f64,
    /// Last year of observed data; later timestamps are forecasts
    pub boundary_year: i32,
    /// Last forecast year, used to draw the shaded forecast window
    pub forecast_horizon_year: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            geo_data_path: "data/predicted_data.geojson".into(),
            predictions_path: "updated_all_country_predictions.json".into(),
            min_year: 1975,
            default_year: 2019,
            freshwater_cap: 18000.0,
            boundary_year: 2019,
            forecast_horizon_year: 2040,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_should_fill_defaults() {
        let config: Config = serde_json::from_str(r#"{"boundary_year": 2020}"#).unwrap();
        assert_eq!(config.boundary_year, 2020);
        assert_eq!(config.freshwater_cap, 18000.0);
        assert_eq!(config.min_year, 1975);
    }
}
