//! Readers for the two static inputs: the per-country, per-year GeoJSON records and the
//! precomputed forecast JSON. Both are parsed into polars frames once, at startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use geojson::{GeoJson, JsonObject, JsonValue};
use log::{debug, info, warn};
use polars::{frame::DataFrame, prelude::NamedFrom, series::Series};
use serde::{Deserialize, Serialize};

use crate::error::WaterTrackerError;
use crate::geo::geometry_to_wkt;
use crate::COL;

fn read_input<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|err| {
        WaterTrackerError::malformed(path.display().to_string(), format!("cannot read file: {err}"))
            .into()
    })
}

/// Load the country-year records from a GeoJSON feature collection
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let contents = read_input(path)?;
    let records = parse_records(&contents, &path.display().to_string())?;
    info!("Loaded {} country-year records from {}", records.height(), path.display());
    Ok(records)
}

/// Load the forecasts from a JSON object keyed by country then metric
pub fn load_forecasts<P: AsRef<Path>>(path: P) -> Result<Forecasts> {
    let path = path.as_ref();
    let contents = read_input(path)?;
    let forecasts = parse_forecasts(&contents, &path.display().to_string())?;
    info!(
        "Loaded {} forecast points for {} countries from {}",
        forecasts.frame.height(),
        forecasts.countries.len(),
        path.display()
    );
    Ok(forecasts)
}

fn property_string(properties: &JsonObject, key: &str) -> Option<String> {
    match properties.get(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn property_f64(properties: &JsonObject, key: &str) -> Option<f64> {
    match properties.get(key)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| !value.is_nan())
}

fn property_year(properties: &JsonObject, key: &str) -> Option<i32> {
    match properties.get(key)? {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|value| value as i64))
            .and_then(|value| i32::try_from(value).ok()),
        JsonValue::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

/// Parse GeoJSON text into the records frame. `source` names the input in error messages.
pub fn parse_records(contents: &str, source: &str) -> Result<DataFrame> {
    let geojson = GeoJson::from_str(contents)
        .map_err(|err| WaterTrackerError::malformed(source, format!("invalid GeoJSON: {err}")))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(WaterTrackerError::malformed(source, "expected a FeatureCollection").into());
    };

    let n = collection.features.len();
    let mut countries: Vec<String> = Vec::with_capacity(n);
    let mut codes: Vec<String> = Vec::with_capacity(n);
    let mut years: Vec<i32> = Vec::with_capacity(n);
    let mut attributes: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(n); COL::RECORD_ATTRIBUTES.len()];
    let mut geometries: Vec<Option<String>> = Vec::with_capacity(n);

    for (idx, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties.unwrap_or_default();
        let required = |key: &str| {
            WaterTrackerError::malformed(source, format!("feature {idx} has no valid `{key}`"))
        };
        countries.push(property_string(&properties, COL::COUNTRY).ok_or_else(|| required(COL::COUNTRY))?);
        codes.push(
            property_string(&properties, COL::COUNTRY_CODE)
                .ok_or_else(|| required(COL::COUNTRY_CODE))?,
        );
        years.push(property_year(&properties, COL::YEAR).ok_or_else(|| required(COL::YEAR))?);
        for (values, column) in attributes.iter_mut().zip(COL::RECORD_ATTRIBUTES) {
            values.push(property_f64(&properties, column));
        }
        let geometry = match feature.geometry {
            Some(geometry) => Some(geometry_to_wkt(geometry).with_context(|| {
                WaterTrackerError::malformed(source, format!("feature {idx} has an invalid geometry"))
            })?),
            None => {
                warn!("Feature {idx} in {source} has no geometry");
                None
            }
        };
        geometries.push(geometry);
    }

    let mut columns = vec![
        Series::new(COL::COUNTRY, countries),
        Series::new(COL::COUNTRY_CODE, codes),
        Series::new(COL::YEAR, years),
    ];
    columns.extend(
        COL::RECORD_ATTRIBUTES
            .iter()
            .zip(attributes)
            .map(|(column, values)| Series::new(column, values)),
    );
    columns.push(Series::new(COL::GEOMETRY, geometries));
    Ok(DataFrame::new(columns)?)
}

/// A forecast timestamp. The forecasting tool writes either a bare year or a date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Timestamp {
    /// The calendar year of the timestamp
    pub fn year(&self) -> Option<i32> {
        match self {
            Timestamp::Int(value) => i32::try_from(*value).ok(),
            Timestamp::Float(value) if value.is_finite() => i32::try_from(*value as i64).ok(),
            Timestamp::Float(_) => None,
            Timestamp::Text(text) => {
                let text = text.trim();
                text.parse::<i32>().ok().or_else(|| {
                    text.get(..10)
                        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
                        .map(|date| date.year())
                })
            }
        }
    }
}

/// One point of a forecast series
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: Timestamp,
    pub yhat: Option<f64>,
    pub yhat_lower: Option<f64>,
    pub yhat_upper: Option<f64>,
}

/// Forecasts in long form (one row per country, metric and timestamp) together with the countries
/// in the order the file lists them
#[derive(Debug)]
pub struct Forecasts {
    pub frame: DataFrame,
    pub countries: Vec<String>,
}

/// Parse forecast JSON text into long form. `source` names the input in error messages.
pub fn parse_forecasts(contents: &str, source: &str) -> Result<Forecasts> {
    let root: serde_json::Map<String, JsonValue> = serde_json::from_str(contents)
        .map_err(|err| WaterTrackerError::malformed(source, format!("invalid forecast JSON: {err}")))?;

    let mut countries: Vec<String> = Vec::with_capacity(root.len());
    let mut country_col: Vec<String> = vec![];
    let mut metric_col: Vec<String> = vec![];
    let mut ds_col: Vec<i32> = vec![];
    let mut yhat_col: Vec<Option<f64>> = vec![];
    let mut lower_col: Vec<Option<f64>> = vec![];
    let mut upper_col: Vec<Option<f64>> = vec![];

    for (country, metrics) in root {
        let metrics: BTreeMap<String, Vec<ForecastPoint>> = serde_json::from_value(metrics)
            .map_err(|err| {
                WaterTrackerError::malformed(source, format!("invalid forecasts for {country}: {err}"))
            })?;
        for (metric, points) in metrics {
            debug!("{country}: {} points for {metric}", points.len());
            for point in points {
                let year = point.ds.year().ok_or_else(|| {
                    WaterTrackerError::malformed(
                        source,
                        format!("invalid timestamp {:?} for {country}/{metric}", point.ds),
                    )
                })?;
                country_col.push(country.clone());
                metric_col.push(metric.clone());
                ds_col.push(year);
                yhat_col.push(point.yhat);
                lower_col.push(point.yhat_lower);
                upper_col.push(point.yhat_upper);
            }
        }
        countries.push(country);
    }

    let frame = DataFrame::new(vec![
        Series::new(COL::COUNTRY, country_col),
        Series::new(COL::METRIC, metric_col),
        Series::new(COL::DS, ds_col),
        Series::new(COL::YHAT, yhat_col),
        Series::new(COL::YHAT_LOWER, lower_col),
        Series::new(COL::YHAT_UPPER, upper_col),
    ])?;
    Ok(Forecasts { frame, countries })
}
