//! Builds the choropleth frame for a single year: the year's slice of the records with the capped
//! freshwater value, and the quantile bin edges computed over that slice only.

use anyhow::Result;
use log::debug;
use polars::prelude::*;
use serde::Serialize;

use crate::geo::{bounds, frame_to_features, BBox};
use crate::store::DataStore;
use crate::view::EmptyReason;
use crate::COL;

/// Percentiles used as bin edges: five intervals with an equal share of countries each
pub const QUANTILES: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

pub const PALETTE: &str = "RdYlBu";
pub const TILES: &str = "cartodb positron";
pub const CENTER: [f64; 2] = [20.0, 0.0];
pub const ZOOM: u8 = 2;
pub const KEY_ON: &str = "feature.properties.Country_Code";

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PopupField {
    pub field: &'static str,
    pub alias: &'static str,
}

pub const POPUP_FIELDS: [PopupField; 5] = [
    PopupField {
        field: COL::COUNTRY,
        alias: "Country:",
    },
    PopupField {
        field: COL::COUNTRY_CODE,
        alias: "Country Code:",
    },
    PopupField {
        field: COL::ANNUAL_FRESHWATER_USE,
        alias: "Annual Freshwater Use:",
    },
    PopupField {
        field: COL::GDP_PER_CAPITA,
        alias: "GDP Per Capita:",
    },
    PopupField {
        field: COL::FRESHWATER_RESOURCES_PER_CAPITA_M3,
        alias: "Freshwater Availability (m^3/person/year):",
    },
];

/// The records of one year, ready for choropleth rendering
#[derive(Debug)]
pub struct MapFrame {
    pub year: i32,
    /// Records of the year with an added `Adjusted_Freshwater` column
    pub data: DataFrame,
    /// Six non-decreasing bin edges, `None` when the year has no freshwater values
    pub bins: Option<Vec<f64>>,
}

/// Select the records of `year` and add the freshwater value clamped to `freshwater_cap`
pub fn select_year(records: &DataFrame, year: i32, freshwater_cap: f64) -> Result<DataFrame> {
    let freshwater = col(COL::FRESHWATER_RESOURCES_PER_CAPITA_M3);
    Ok(records
        .clone()
        .lazy()
        .filter(col(COL::YEAR).eq(lit(year)))
        .with_column(
            when(freshwater.clone().gt(lit(freshwater_cap)))
                .then(lit(freshwater_cap))
                .otherwise(freshwater)
                .alias(COL::ADJUSTED_FRESHWATER),
        )
        .collect()?)
}

/// Quantile bin edges of `column` with linear interpolation. Nulls are ignored; `None` is returned
/// when no value is left.
pub fn quantile_bins(df: &DataFrame, column: &str) -> Result<Option<Vec<f64>>> {
    if df.height() == 0 {
        return Ok(None);
    }
    let exprs: Vec<Expr> = QUANTILES
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            col(column)
                .quantile(lit(*q), QuantileInterpolOptions::Linear)
                .alias(&format!("q{idx}"))
        })
        .collect();
    let row = df.clone().lazy().select(exprs).collect()?;
    let edges = row
        .get_columns()
        .iter()
        .map(|edge| Ok(edge.cast(&DataType::Float64)?.f64()?.get(0)))
        .collect::<Result<Option<Vec<f64>>>>()?;
    Ok(edges)
}

/// Build the map frame for `year`. A year outside the store's year range, or without records,
/// yields an empty frame and no bins.
pub fn build_map_frame(store: &DataStore, year: i32, freshwater_cap: f64) -> Result<MapFrame> {
    let in_range = store
        .year_range()
        .is_some_and(|(min_year, max_year)| (min_year..=max_year).contains(&year));
    let mut data = select_year(store.records(), year, freshwater_cap)?;
    if !in_range {
        debug!("{year} is outside {:?}, mapping nothing", store.year_range());
        data = data.head(Some(0));
    }
    let bins = quantile_bins(&data, COL::ADJUSTED_FRESHWATER)?;
    debug!("map frame for {year}: {} rows, bins {bins:?}", data.height());
    Ok(MapFrame { year, data, bins })
}

impl MapFrame {
    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    pub fn legend(&self) -> String {
        format!("Freshwater Availability (m^3/person/year) - {}", self.year)
    }

    /// Why nothing can be coloured for this year, if that is the case
    pub fn empty_reason(&self) -> Option<EmptyReason> {
        self.bins
            .is_none()
            .then_some(EmptyReason::NoDataForYear { year: self.year })
    }

    /// Describe the map for a Leaflet choropleth layer
    pub fn to_view(&self) -> Result<ChoroplethView> {
        Ok(ChoroplethView {
            year: self.year,
            legend: self.legend(),
            bins: self.bins.clone(),
            key_on: KEY_ON,
            value_field: COL::ADJUSTED_FRESHWATER,
            fill_color: PALETTE,
            fill_opacity: 0.7,
            line_opacity: 0.2,
            popup: POPUP_FIELDS.to_vec(),
            tiles: TILES,
            center: CENTER,
            zoom: ZOOM,
            bounds: bounds(&self.data)?,
            message: self.empty_reason().map(|reason| reason.to_string()),
            geojson: geojson::FeatureCollection {
                bbox: None,
                features: frame_to_features(&self.data)?,
                foreign_members: None,
            },
        })
    }
}

/// Everything a map client needs to draw the choropleth for one year
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoroplethView {
    pub year: i32,
    pub legend: String,
    pub bins: Option<Vec<f64>>,
    pub key_on: &'static str,
    pub value_field: &'static str,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub line_opacity: f64,
    pub popup: Vec<PopupField>,
    pub tiles: &'static str,
    pub center: [f64; 2],
    pub zoom: u8,
    pub bounds: Option<BBox>,
    pub message: Option<String>,
    pub geojson: geojson::FeatureCollection,
}
