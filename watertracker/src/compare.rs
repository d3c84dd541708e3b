//! Side-by-side comparison of several countries for one metric, with an optional per-country
//! transform, split at the boundary year into observed and forecast segments.

use std::fmt::Display;
use std::str::FromStr;

use anyhow::Result;
use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use log::{debug, warn};
use nonempty::NonEmpty;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};

use crate::error::WaterTrackerError;
use crate::metric::Metric;
use crate::series::series_frame;
use crate::store::DataStore;
use crate::view::{EmptyReason, View};
use crate::COL;

/// How values are presented in a comparison
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum AnalysisMode {
    #[default]
    #[strum(serialize = "nominal")]
    Nominal,
    #[strum(serialize = "cumulative")]
    Cumulative,
    #[strum(serialize = "yoy", serialize = "YoY Growth Rate (%)")]
    YoyGrowth,
    #[strum(
        serialize = "3yr",
        serialize = "threeYearGrowth",
        serialize = "3Yr Avg. Growth Rate (%)"
    )]
    ThreeYearGrowth,
}

impl AnalysisMode {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::Nominal => "Nominal",
            AnalysisMode::Cumulative => "Cumulative",
            AnalysisMode::YoyGrowth => "YoY Growth Rate (%)",
            AnalysisMode::ThreeYearGrowth => "3Yr Avg. Growth Rate (%)",
        }
    }
}

impl TryFrom<String> for AnalysisMode {
    type Error = WaterTrackerError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        AnalysisMode::from_str(value.trim())
            .map_err(|_| WaterTrackerError::UnknownAnalysisMode(value.clone()))
    }
}

impl From<AnalysisMode> for String {
    fn from(value: AnalysisMode) -> Self {
        value.label().to_string()
    }
}

impl Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A transform of a value column evaluated independently within each group
#[enum_dispatch]
pub trait SeriesTransform {
    fn expr(&self, value: &str, group: &str) -> Expr;
}

#[enum_dispatch(SeriesTransform)]
#[derive(Debug, Clone)]
pub enum ComparisonTransform {
    Nominal(NominalTransform),
    Cumulative(CumulativeTransform),
    PercentChange(PercentChangeTransform),
}

/// Values unchanged
#[derive(Debug, Clone)]
pub struct NominalTransform;

/// Change since the first non-null value of the group, so each group starts at zero. Missing
/// values stay missing.
#[derive(Debug, Clone)]
pub struct CumulativeTransform;

/// Percent change from the value `periods` rows earlier in the group. The first `periods` rows
/// of each group are null.
#[derive(Debug, Clone)]
pub struct PercentChangeTransform {
    pub periods: i64,
}

impl SeriesTransform for NominalTransform {
    fn expr(&self, value: &str, _group: &str) -> Expr {
        col(value)
    }
}

impl SeriesTransform for CumulativeTransform {
    fn expr(&self, value: &str, group: &str) -> Expr {
        (col(value) - col(value).drop_nulls().first()).over([col(group)])
    }
}

impl SeriesTransform for PercentChangeTransform {
    fn expr(&self, value: &str, group: &str) -> Expr {
        let previous = col(value).shift(lit(self.periods));
        ((col(value) - previous.clone()) / previous * lit(100.0)).over([col(group)])
    }
}

impl From<AnalysisMode> for ComparisonTransform {
    fn from(value: AnalysisMode) -> Self {
        match value {
            AnalysisMode::Nominal => NominalTransform.into(),
            AnalysisMode::Cumulative => CumulativeTransform.into(),
            AnalysisMode::YoyGrowth => PercentChangeTransform { periods: 1 }.into(),
            AnalysisMode::ThreeYearGrowth => PercentChangeTransform { periods: 3 }.into(),
        }
    }
}

/// Transformed series of several countries, split at the boundary year
#[derive(Debug)]
pub struct Comparison {
    pub metric: Metric,
    pub mode: AnalysisMode,
    pub boundary_year: i32,
    /// Resolved country names in selection order
    pub countries: Vec<String>,
    /// Rows with `ds <= boundary_year`; columns `Country`, `ds`, `yhat`
    pub historical: DataFrame,
    /// Rows with `ds > boundary_year`; same columns
    pub predicted: DataFrame,
}

impl Comparison {
    /// Both segments stacked back together, historical rows first
    pub fn combined(&self) -> Result<DataFrame> {
        Ok(self.historical.vstack(&self.predicted)?)
    }
}

/// Split a frame into the rows at or before `boundary_year` and the rows after it
pub fn split_at_boundary(df: &DataFrame, boundary_year: i32) -> Result<(DataFrame, DataFrame)> {
    let historical = df
        .clone()
        .lazy()
        .filter(col(COL::DS).lt_eq(lit(boundary_year)))
        .collect()?;
    let predicted = df
        .clone()
        .lazy()
        .filter(col(COL::DS).gt(lit(boundary_year)))
        .collect()?;
    Ok((historical, predicted))
}

/// Concatenate the series of the selected countries (in selection order, each sorted by
/// timestamp) and apply `transform` within each country
pub fn combine_series(
    forecasts: &DataFrame,
    countries: &NonEmpty<String>,
    metric: Metric,
    transform: &ComparisonTransform,
) -> Result<DataFrame> {
    let frames: Vec<LazyFrame> = countries
        .iter()
        .map(|country| series_frame(forecasts, country, metric, &[COL::COUNTRY, COL::DS, COL::YHAT]))
        .collect();
    Ok(concat(frames, UnionArgs::default())?
        .with_column(transform.expr(COL::YHAT, COL::COUNTRY).alias(COL::YHAT))
        .collect()?)
}

/// Compare `countries` for `metric` under `mode`. No selection, or a selection without any data,
/// yields an empty view rather than an error. Unknown countries are skipped.
pub fn compare_countries(
    store: &DataStore,
    countries: &[String],
    metric: Metric,
    mode: AnalysisMode,
    boundary_year: i32,
) -> Result<View<Comparison>> {
    let Some(selection) = NonEmpty::from_slice(countries) else {
        return Ok(View::Empty(EmptyReason::NoCountriesSelected));
    };
    let resolved: Vec<String> = selection
        .iter()
        .filter_map(|key| {
            let name = store.resolve_country(key);
            if name.is_none() {
                warn!("Skipping unknown country {key:?}");
            }
            name
        })
        .unique()
        .collect();
    let no_series = || {
        View::Empty(EmptyReason::NoSeries {
            country: selection.iter().join(", "),
            metric,
        })
    };
    let Some(resolved_countries) = NonEmpty::from_vec(resolved) else {
        return Ok(no_series());
    };

    let combined = combine_series(store.forecasts(), &resolved_countries, metric, &ComparisonTransform::from(mode))?;
    debug!(
        "comparison of {:?} for {} ({mode}): {} rows",
        resolved_countries,
        metric.key(),
        combined.height()
    );
    if combined.height() == 0 {
        return Ok(no_series());
    }
    let (historical, predicted) = split_at_boundary(&combined, boundary_year)?;
    Ok(View::Data(Comparison {
        metric,
        mode,
        boundary_year,
        countries: resolved_countries.into(),
        historical,
        predicted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::test_store;

    fn countries(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| key.to_string()).collect()
    }

    fn values(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        df.column(column).unwrap().f64().unwrap().into_iter().collect()
    }

    fn assert_close(actual: &[Option<f64>], expected: &[Option<f64>]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} != {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            match (a, e) {
                (Some(a), Some(e)) => assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}"),
                (None, None) => {}
                _ => panic!("{actual:?} != {expected:?}"),
            }
        }
    }

    fn compare(keys: &[&str], mode: AnalysisMode) -> DataFrame {
        compare_countries(&test_store(), &countries(keys), Metric::GdpPerCapita, mode, 2019)
            .unwrap()
            .data()
            .expect("selection has data")
            .combined()
            .unwrap()
    }

    #[test]
    fn analysis_mode_should_parse_from_names_and_labels() {
        assert_eq!(AnalysisMode::from_str("Cumulative").unwrap(), AnalysisMode::Cumulative);
        assert_eq!(AnalysisMode::from_str("yoy").unwrap(), AnalysisMode::YoyGrowth);
        assert_eq!(
            AnalysisMode::from_str("3Yr Avg. Growth Rate (%)").unwrap(),
            AnalysisMode::ThreeYearGrowth
        );
        assert!(AnalysisMode::from_str("median").is_err());
        let mode: AnalysisMode = serde_json::from_str(r#""3yr""#).unwrap();
        assert_eq!(mode, AnalysisMode::ThreeYearGrowth);
        assert!(serde_json::from_str::<AnalysisMode>(r#""median""#).is_err());
    }

    #[test]
    fn empty_selection_should_be_informational() -> anyhow::Result<()> {
        let view = compare_countries(&test_store(), &[], Metric::GdpPerCapita, AnalysisMode::Nominal, 2019)?;
        match view {
            View::Empty(reason) => assert_eq!(reason, EmptyReason::NoCountriesSelected),
            View::Data(_) => panic!("nothing was selected"),
        }
        Ok(())
    }

    #[test]
    fn nominal_should_keep_selection_then_timestamp_order() -> anyhow::Result<()> {
        let df = compare(&["USA", "India"], AnalysisMode::Nominal);
        let names: Vec<Option<&str>> = df.column(COL::COUNTRY)?.str()?.into_iter().collect();
        // Segments are stacked historical first, so order within each segment is checked
        let ds: Vec<Option<i32>> = df.column(COL::DS)?.i32()?.into_iter().collect();
        assert_eq!(
            names,
            vec![
                Some("United States"), Some("India"), Some("India"),
                Some("United States"), Some("United States"),
                Some("India"), Some("India"), Some("India"),
            ]
        );
        assert_eq!(
            ds,
            vec![
                Some(2019), Some(2018), Some(2019),
                Some(2020), Some(2021),
                Some(2020), Some(2021), Some(2022),
            ]
        );
        Ok(())
    }

    #[test]
    fn cumulative_should_start_each_country_at_zero() -> anyhow::Result<()> {
        let comparison = compare_countries(
            &test_store(),
            &countries(&["USA", "India"]),
            Metric::GdpPerCapita,
            AnalysisMode::Cumulative,
            2100,
        )?
        .data()
        .expect("selection has data");
        assert_eq!(comparison.countries, vec!["United States", "India"]);
        assert_eq!(comparison.predicted.height(), 0);
        // US: 100, 110, 121; India: 50, 40, 50, 60, 75
        assert_close(
            &values(&comparison.historical, COL::YHAT),
            &[
                Some(0.0), Some(10.0), Some(21.0),
                Some(0.0), Some(-10.0), Some(0.0), Some(10.0), Some(25.0),
            ],
        );
        Ok(())
    }

    #[test]
    fn cumulative_should_start_at_first_known_value() -> anyhow::Result<()> {
        let forecasts = df!(
            COL::COUNTRY => &["A", "A", "B", "B", "B"],
            COL::METRIC => &["GDP_Per_Capita"; 5],
            COL::DS => &[2019, 2020, 2019, 2020, 2021],
            COL::YHAT => &[Some(1.0), Some(2.0), None, Some(3.0), Some(5.0)],
            COL::YHAT_LOWER => &[None::<f64>; 5],
            COL::YHAT_UPPER => &[None::<f64>; 5]
        )?;
        let df = combine_series(
            &forecasts,
            &nonempty::nonempty!["A".to_string(), "B".to_string()],
            Metric::GdpPerCapita,
            &ComparisonTransform::from(AnalysisMode::Cumulative),
        )?;
        assert_close(
            &values(&df, COL::YHAT),
            &[Some(0.0), Some(1.0), None, Some(0.0), Some(2.0)],
        );
        Ok(())
    }

    #[test]
    fn yoy_should_be_percent_change_from_previous_timestamp() -> anyhow::Result<()> {
        let comparison = compare_countries(
            &test_store(),
            &countries(&["India", "United States"]),
            Metric::GdpPerCapita,
            AnalysisMode::YoyGrowth,
            2100,
        )?
        .data()
        .expect("selection has data");
        assert_close(
            &values(&comparison.historical, COL::YHAT),
            &[
                None, Some(-20.0), Some(25.0), Some(20.0), Some(25.0),
                None, Some(10.0), Some(10.0),
            ],
        );
        Ok(())
    }

    #[test]
    fn three_period_growth_should_skip_first_three_timestamps() -> anyhow::Result<()> {
        let comparison = compare_countries(
            &test_store(),
            &countries(&["India", "United States"]),
            Metric::GdpPerCapita,
            AnalysisMode::ThreeYearGrowth,
            2100,
        )?
        .data()
        .expect("selection has data");
        // India 2021: 60 vs 50 in 2018; 2022: 75 vs 40 in 2019
        assert_close(
            &values(&comparison.historical, COL::YHAT),
            &[None, None, None, Some(20.0), Some(87.5), None, None, None],
        );
        Ok(())
    }

    #[test]
    fn split_should_partition_rows_at_the_boundary() -> anyhow::Result<()> {
        let comparison = compare_countries(
            &test_store(),
            &countries(&["India", "USA"]),
            Metric::GdpPerCapita,
            AnalysisMode::Nominal,
            2019,
        )?
        .data()
        .expect("selection has data");
        let historical_ds = comparison.historical.column(COL::DS)?.i32()?;
        let predicted_ds = comparison.predicted.column(COL::DS)?.i32()?;
        assert!(historical_ds.into_iter().flatten().all(|ds| ds <= 2019));
        assert!(predicted_ds.into_iter().flatten().all(|ds| ds > 2019));
        assert_eq!(comparison.historical.height() + comparison.predicted.height(), 8);
        assert_eq!(comparison.historical.height(), 3);
        Ok(())
    }

    #[test]
    fn unknown_and_duplicate_countries_should_be_dropped() -> anyhow::Result<()> {
        let df = compare(&["India", "Atlantis", "india"], AnalysisMode::Nominal);
        assert_eq!(df.height(), 5);
        Ok(())
    }

    #[test]
    fn selection_without_data_should_be_empty() -> anyhow::Result<()> {
        let view = compare_countries(
            &test_store(),
            &countries(&["World", "Atlantis"]),
            Metric::GdpPerCapita,
            AnalysisMode::Nominal,
            2019,
        )?;
        assert!(view.is_empty());
        Ok(())
    }
}
