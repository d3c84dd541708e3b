use anyhow::{anyhow, Result};
use enum_dispatch::enum_dispatch;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value;
use std::io::Cursor;
use std::io::Write;

use crate::geo::frame_to_features;

/// Utility function to convert from polars `AnyValue` to `serde_json::Value`
/// Covers the types the loaded frames can hold.
pub fn any_value_to_json(value: &AnyValue) -> Result<Value> {
    match value {
        AnyValue::Null => Ok(Value::Null),
        AnyValue::Boolean(b) => Ok(Value::Bool(*b)),
        AnyValue::String(s) => Ok(Value::String((*s).to_string())),
        AnyValue::StringOwned(s) => Ok(Value::String(s.to_string())),
        AnyValue::Int32(n) => Ok(json!(*n)),
        AnyValue::Int64(n) => Ok(json!(*n)),
        AnyValue::UInt32(n) => Ok(json!(*n)),
        AnyValue::UInt64(n) => Ok(json!(*n)),
        AnyValue::Float32(n) => Ok(float_to_json(f64::from(*n))),
        AnyValue::Float64(n) => Ok(float_to_json(*n)),
        _ => Err(anyhow!("Failed to convert type")),
    }
}

// NaN and infinities (e.g. a percent change from zero) have no JSON representation
fn float_to_json(n: f64) -> Value {
    if n.is_finite() {
        json!(n)
    } else {
        Value::Null
    }
}

/// Convert every row of the frame into a JSON object keyed by column name
pub fn frame_to_records(df: &DataFrame) -> Result<Vec<serde_json::Map<String, Value>>> {
    (0..df.height())
        .map(|idx| {
            df.get_columns()
                .iter()
                .map(|col| Ok((col.name().to_string(), any_value_to_json(&col.get(idx)?)?)))
                .collect::<Result<serde_json::Map<String, Value>>>()
        })
        .collect()
}

/// Trait to define different output generators. Defines two
/// functions, format which generates a serialized string of the
/// `DataFrame` and save which generates a file with the generated
/// file
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()>;
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        // Just creating an empty vec to store the buffered output
        let mut data: Vec<u8> = vec![];
        let mut buff = Cursor::new(&mut data);
        self.save(&mut buff, df)?;

        Ok(String::from_utf8(data)?)
    }
}

/// Enum of OutputFormatters one for each potential
/// output type
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    GeoJSON(GeoJSONFormatter),
    GeoJSONSeq(GeoJSONSeqFormatter),
    Csv(CSVFormatter),
    Json(JSONFormatter),
}

/// Format the results as geojson sequence format
/// This is one line per feature serialized as a
/// geojson feature
#[derive(Serialize, Deserialize, Debug)]
pub struct GeoJSONSeqFormatter;

impl OutputGenerator for GeoJSONSeqFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        for feature in frame_to_features(df)? {
            writeln!(writer, "{feature}")?;
        }
        Ok(())
    }
}

/// Format the results as a CSV file, geometries (if any) as well-known text
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CSVFormatter;

impl OutputGenerator for CSVFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        CsvWriter::new(writer).finish(df)?;
        Ok(())
    }
}

/// Format the results as a geojson feature collection
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct GeoJSONFormatter;

impl OutputGenerator for GeoJSONFormatter {
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        let feature_collection = geojson::FeatureCollection {
            bbox: None,
            features: frame_to_features(df)?,
            foreign_members: None,
        };
        Ok(feature_collection.to_string())
    }

    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        let result = self.format(df)?;
        writer.write_all(result.as_bytes())?;

        Ok(())
    }
}

/// Format the results as a JSON array with one object per row
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct JSONFormatter;

impl OutputGenerator for JSONFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        serde_json::to_writer(&mut *writer, &frame_to_records(df)?)?;
        writeln!(writer)?;
        Ok(())
    }
}
