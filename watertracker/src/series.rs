use anyhow::Result;
use log::debug;
use polars::prelude::*;

use crate::metric::Metric;
use crate::store::DataStore;
use crate::view::{EmptyReason, View};
use crate::COL;

/// The forecast series of one country and metric, ordered by timestamp
#[derive(Debug)]
pub struct CountrySeries {
    pub country: String,
    pub metric: Metric,
    /// Columns `ds`, `yhat`, `yhat_lower`, `yhat_upper`
    pub data: DataFrame,
}

/// Forecast rows of `country` for `metric` sorted by timestamp, keeping the given columns
pub(crate) fn series_frame(
    forecasts: &DataFrame,
    country: &str,
    metric: Metric,
    columns: &[&str],
) -> LazyFrame {
    forecasts
        .clone()
        .lazy()
        .filter(
            col(COL::COUNTRY)
                .eq(lit(country))
                .and(col(COL::METRIC).eq(lit(metric.key()))),
        )
        .select(columns.iter().map(|column| col(column)).collect::<Vec<_>>())
        .sort([COL::DS], SortMultipleOptions::default())
}

/// Look up the series of a single country. An unknown country or a country without the metric
/// yields an empty view, never an error.
pub fn select_series(store: &DataStore, country: &str, metric: Metric) -> Result<View<CountrySeries>> {
    let no_series = || {
        View::Empty(EmptyReason::NoSeries {
            country: country.to_string(),
            metric,
        })
    };
    let Some(name) = store.resolve_country(country) else {
        return Ok(no_series());
    };
    let data = series_frame(
        store.forecasts(),
        &name,
        metric,
        &[COL::DS, COL::YHAT, COL::YHAT_LOWER, COL::YHAT_UPPER],
    )
    .collect()?;
    debug!("series for {name}/{}: {} rows", metric.key(), data.height());
    if data.height() == 0 {
        return Ok(no_series());
    }
    Ok(View::Data(CountrySeries {
        country: name,
        metric,
        data,
    }))
}
