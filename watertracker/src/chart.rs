//! Vega-Lite specifications for the single-country and comparison charts. The specs embed their
//! data so a client only has to hand them to a Vega-Lite renderer.

use anyhow::Result;
use serde_json::{json, Value};

use crate::compare::Comparison;
use crate::formatters::frame_to_records;
use crate::series::CountrySeries;
use crate::COL;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Lets the user pan and zoom both axes
fn interactive() -> Value {
    json!([{"name": "zoom", "select": "interval", "bind": "scales"}])
}

fn year_axis() -> Value {
    json!({"field": COL::DS, "type": "ordinal", "axis": {"title": "Year", "labelAngle": 0}})
}

/// Band, line and points of one forecast series
pub fn series_chart(series: &CountrySeries) -> Result<Value> {
    let label = series.metric.label();
    let color = series.metric.color();
    let value_axis = json!({"field": COL::YHAT, "type": "quantitative", "axis": {"title": label}});
    Ok(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": {
            "text": format!("{label} Predictions Over Time for {}", series.country),
            "fontSize": 16,
            "fontWeight": "bold"
        },
        "width": 700,
        "height": 400,
        "data": {"values": frame_to_records(&series.data)?},
        "encoding": {"x": year_axis()},
        "layer": [
            {
                "mark": {"type": "area", "opacity": 0.3, "color": color},
                "encoding": {
                    "y": {"field": COL::YHAT_UPPER, "type": "quantitative"},
                    "y2": {"field": COL::YHAT_LOWER},
                    "tooltip": null
                }
            },
            {
                "mark": {"type": "line", "color": color},
                "encoding": {"y": value_axis}
            },
            {
                "mark": {"type": "point", "color": color, "size": 30},
                "params": interactive(),
                "encoding": {
                    "y": value_axis,
                    "tooltip": [
                        {"field": COL::DS, "type": "ordinal", "title": "Year"},
                        {"field": COL::YHAT, "type": "quantitative", "title": label, "format": ".2f"},
                        {"field": COL::YHAT_LOWER, "type": "quantitative", "title": "Lower Bound", "format": ".2f"},
                        {"field": COL::YHAT_UPPER, "type": "quantitative", "title": "Upper Bound", "format": ".2f"}
                    ]
                }
            }
        ],
        "config": {"axis": {"grid": true, "labelFontSize": 12, "titleFontSize": 12}}
    }))
}

/// Solid historical and dashed predicted segments per country over a shaded forecast window
/// from the first year after the boundary to `horizon_year`
pub fn comparison_chart(comparison: &Comparison, horizon_year: i32) -> Result<Value> {
    let label = comparison.metric.label();
    let first_forecast_year = comparison.boundary_year + 1;
    let encoding = json!({
        "x": {"field": COL::DS, "type": "ordinal", "title": "Year"},
        "y": {"field": COL::YHAT, "type": "quantitative", "title": label},
        "color": {"field": COL::COUNTRY, "type": "nominal", "legend": {"title": "Country"}},
        "tooltip": [
            {"field": COL::COUNTRY, "type": "nominal"},
            {"field": COL::DS, "type": "ordinal", "title": "Year"},
            {"field": COL::YHAT, "type": "quantitative", "title": label, "format": ".2f"}
        ]
    });
    let historical = json!({"values": frame_to_records(&comparison.historical)?});
    let predicted = json!({"values": frame_to_records(&comparison.predicted)?});
    Ok(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": {
            "text": format!("Comparison of {label} Over Time ({})", comparison.mode),
            "fontSize": 18,
            "fontWeight": "bold",
            "subtitle": format!(
                "Dotted lines and shaded area represent predicted values post-{} (Up to {horizon_year}).",
                comparison.boundary_year
            ),
            "subtitleFontSize": 14,
            "anchor": "start"
        },
        "width": 800,
        "height": 500,
        "layer": [
            {
                "data": {"values": [{(COL::DS): first_forecast_year}, {(COL::DS): horizon_year}]},
                "mark": {"type": "rect", "opacity": 0.4, "color": "lightgray"},
                "encoding": {
                    "x": {"field": COL::DS, "aggregate": "min", "type": "ordinal"},
                    "x2": {"field": COL::DS, "aggregate": "max"},
                    "tooltip": null
                }
            },
            {"data": historical, "mark": {"type": "line"}, "encoding": encoding},
            {
                "data": historical,
                "mark": {"type": "circle", "size": 30},
                "params": interactive(),
                "encoding": encoding
            },
            {"data": predicted, "mark": {"type": "line", "strokeDash": [2, 2]}, "encoding": encoding},
            {"data": predicted, "mark": {"type": "circle", "size": 30}, "encoding": encoding}
        ]
    }))
}
