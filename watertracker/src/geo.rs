use anyhow::{anyhow, Context, Result};
use geo::{BoundingRect, Geometry};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use wkt::{ToWkt, TryFromWkt};

use crate::formatters::any_value_to_json;
use crate::COL;

/// Convert a GeoJSON geometry into the well-known text stored in the `geometry` column
pub fn geometry_to_wkt(geometry: geojson::Geometry) -> Result<String> {
    let geom: Geometry<f64> = Geometry::try_from(geometry)
        .map_err(|err| anyhow!("Unsupported GeoJSON geometry: {err}"))?;
    Ok(geom.wkt_string())
}

/// Parse a well-known text string back into a geometry
pub fn wkt_to_geometry(wkt_str: &str) -> Result<Geometry<f64>> {
    Geometry::try_from_wkt_str(wkt_str)
        .map_err(|err| anyhow!("Invalid `Geometry<f64>` from well-known text string: {err}"))
}

/// Build one GeoJSON feature per row with a geometry. Every other column becomes a property.
/// Rows with a null geometry are skipped.
pub fn frame_to_features(df: &DataFrame) -> Result<Vec<geojson::Feature>> {
    let geometry_col = df
        .column(COL::GEOMETRY)
        .context("Frame has no geometry column")?;
    let other_cols = df.drop(COL::GEOMETRY)?;
    let mut features: Vec<geojson::Feature> = vec![];

    for (idx, geom) in geometry_col.str()?.into_iter().enumerate() {
        if let Some(wkt_str) = geom {
            let geom = wkt_to_geometry(wkt_str)?;
            let mut properties = serde_json::Map::new();
            for col in other_cols.get_columns() {
                let val = any_value_to_json(&col.get(idx)?)?;
                properties.insert(col.name().to_string(), val);
            }
            features.push(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::from(&geom)),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
    }
    Ok(features)
}

/// Bounding box as `[left, bottom, right, top]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox(pub [f64; 4]);

impl BBox {
    fn extend(self, other: &BBox) -> BBox {
        BBox([
            self.0[0].min(other.0[0]),
            self.0[1].min(other.0[1]),
            self.0[2].max(other.0[2]),
            self.0[3].max(other.0[3]),
        ])
    }
}

/// Extent of all geometries in the frame, `None` when there are none
pub fn bounds(df: &DataFrame) -> Result<Option<BBox>> {
    let mut extent: Option<BBox> = None;
    for wkt_str in df.column(COL::GEOMETRY)?.str()?.into_iter().flatten() {
        if let Some(rect) = wkt_to_geometry(wkt_str)?.bounding_rect() {
            let bbox = BBox([rect.min().x, rect.min().y, rect.max().x, rect.max().y]);
            extent = Some(match extent {
                Some(current) => current.extend(&bbox),
                None => bbox,
            });
        }
    }
    Ok(extent)
}
