use std::collections::HashMap;

use anyhow::Result;
use log::{debug, info};
use polars::prelude::*;

use crate::config::Config;
use crate::data_source::{load_forecasts, load_records, Forecasts};
use crate::error::WaterTrackerError;
use crate::search::CountrySearch;
use crate::COL;

const REQUIRED_RECORD_COLUMNS: [&str; 5] = [
    COL::COUNTRY,
    COL::COUNTRY_CODE,
    COL::YEAR,
    COL::FRESHWATER_RESOURCES_PER_CAPITA_M3,
    COL::GEOMETRY,
];

const REQUIRED_FORECAST_COLUMNS: [&str; 6] = [
    COL::COUNTRY,
    COL::METRIC,
    COL::DS,
    COL::YHAT,
    COL::YHAT_LOWER,
    COL::YHAT_UPPER,
];

fn check_columns(df: &DataFrame, required: &[&str], source: &str) -> Result<()> {
    let names = df.get_column_names();
    match required.iter().find(|column| !names.contains(column)) {
        Some(missing) => Err(WaterTrackerError::malformed(
            source,
            format!("missing column `{missing}`"),
        )
        .into()),
        None => Ok(()),
    }
}

/// The loaded source tables. Built once and never mutated; every view is derived from a shared
/// reference to it.
#[derive(Debug)]
pub struct DataStore {
    records: DataFrame,
    forecasts: DataFrame,
    countries: Vec<String>,
    /// One row per forecast country with its ISO code, if the records know it
    country_index: DataFrame,
    min_year: i32,
    max_year: Option<i32>,
}

impl DataStore {
    /// Read both static inputs named in the config
    pub fn load(config: &Config) -> Result<Self> {
        let records = load_records(&config.geo_data_path)?;
        let Forecasts { frame, countries } = load_forecasts(&config.predictions_path)?;
        Self::from_frames(records, frame, countries, config.min_year)
    }

    /// Assemble a store from frames already in memory, checking their schemas
    pub fn from_frames(
        records: DataFrame,
        forecasts: DataFrame,
        countries: Vec<String>,
        min_year: i32,
    ) -> Result<Self> {
        check_columns(&records, &REQUIRED_RECORD_COLUMNS, "records")?;
        check_columns(&forecasts, &REQUIRED_FORECAST_COLUMNS, "forecasts")?;
        let max_year = records.column(COL::YEAR)?.i32()?.max();

        let mut codes: HashMap<&str, &str> = HashMap::new();
        for (country, code) in records
            .column(COL::COUNTRY)?
            .str()?
            .into_iter()
            .zip(records.column(COL::COUNTRY_CODE)?.str()?)
        {
            if let (Some(country), Some(code)) = (country, code) {
                codes.entry(country).or_insert(code);
            }
        }
        let country_codes: Vec<Option<&str>> = countries
            .iter()
            .map(|country| codes.get(country.as_str()).copied())
            .collect();
        let country_index = df!(
            COL::COUNTRY => &countries,
            COL::COUNTRY_CODE => &country_codes
        )?;

        info!(
            "Data store ready: {} records, {} forecast rows, {} countries, years {min_year}..={max_year:?}",
            records.height(),
            forecasts.height(),
            countries.len()
        );
        Ok(Self {
            records,
            forecasts,
            countries,
            country_index,
            min_year,
            max_year,
        })
    }

    pub fn records(&self) -> &DataFrame {
        &self.records
    }

    pub fn forecasts(&self) -> &DataFrame {
        &self.forecasts
    }

    /// Countries with forecasts, in file order
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    /// Countries with their ISO codes (null when no record carries one)
    pub fn country_index(&self) -> &DataFrame {
        &self.country_index
    }

    /// Selectable map years, `None` when there are no records
    pub fn year_range(&self) -> Option<(i32, i32)> {
        self.max_year.map(|max_year| (self.min_year, max_year))
    }

    /// Rows of the country index whose name or code matches the search, in file order
    pub fn search_country_index(&self, search: CountrySearch) -> Result<DataFrame> {
        Ok(self
            .country_index
            .clone()
            .lazy()
            .filter(search.into())
            .collect()?)
    }

    /// Countries whose name or code matches the search, in file order
    pub fn search_countries(&self, search: CountrySearch) -> Result<Vec<String>> {
        let matches = self.search_country_index(search)?;
        Ok(matches
            .column(COL::COUNTRY)?
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect())
    }

    /// Resolve a user supplied country key to the name used by the forecasts: an exact name, then
    /// a case insensitive name or ISO code. Returns `None` for unknown keys.
    pub fn resolve_country(&self, key: &str) -> Option<String> {
        if self.countries.iter().any(|country| country == key) {
            return Some(key.to_string());
        }
        let resolved = self
            .search_countries(CountrySearch::exact(key.trim()))
            .ok()
            .and_then(|matches| matches.into_iter().next());
        debug!("Resolved country key {key:?} to {resolved:?}");
        resolved
    }
}
