//! This module stores the column names used across the loaded frames. The record columns must be
//! kept in sync with the property names of the input GeoJSON, and the forecast columns with the
//! field names of the forecast JSON.

pub const COUNTRY: &str = "Country";
pub const COUNTRY_CODE: &str = "Country_Code";
pub const YEAR: &str = "Year";
pub const FRESHWATER_RESOURCES_PER_CAPITA_M3: &str = "Freshwater_Resources_Per_Capita_m3";
pub const ANNUAL_FRESHWATER_USE: &str = "Annual_Freshwater_Use";
pub const GDP_PER_CAPITA: &str = "GDP_Per_Capita";
pub const POPULATION: &str = "Population";
pub const AGRICULTURE_WITHDRAWAL_PERCENT: &str = "Agriculture_Withdrawal_Percent";
pub const GEOMETRY: &str = "geometry";

/// Derived column holding the freshwater value clamped to the configured ceiling.
pub const ADJUSTED_FRESHWATER: &str = "Adjusted_Freshwater";

pub const METRIC: &str = "metric";
pub const DS: &str = "ds";
pub const YHAT: &str = "yhat";
pub const YHAT_LOWER: &str = "yhat_lower";
pub const YHAT_UPPER: &str = "yhat_upper";

/// Numeric attribute columns of a country-year record, in output order.
pub const RECORD_ATTRIBUTES: [&str; 5] = [
    FRESHWATER_RESOURCES_PER_CAPITA_M3,
    ANNUAL_FRESHWATER_USE,
    GDP_PER_CAPITA,
    POPULATION,
    AGRICULTURE_WITHDRAWAL_PERCENT,
];
