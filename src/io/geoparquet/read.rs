use std::{io::Cursor, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use arrow_array::Array;
use arrow_schema::Field;
use bytes::Bytes;
use geo::{Geometry, MultiPolygon};
use geo_traits::to_geo::{ToGeoGeometry, ToGeoMultiPolygon, ToGeoPolygon};
use geoarrow_array::{
    array::{GeometryArray, MultiPolygonArray, PolygonArray},
    GeoArrowArrayAccessor,
};
use geoarrow_schema::GeoArrowType;
use geoparquet::reader::{GeoParquetReaderBuilder, GeoParquetRecordBatchReader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use polars::{frame::DataFrame, io::SerReader, prelude::ParquetReader};

use crate::geom::{reproject_to_geographic, Crs};

/// A GeoParquet table split into attributes and lon/lat geometries (row-aligned).
#[derive(Debug)]
pub(crate) struct GeoTable {
    pub data: DataFrame,
    pub shapes: Vec<MultiPolygon<f64>>,
}

/// Collect one batch's geometry column as MultiPolygons. Nulls become empty shapes
/// so rows stay aligned with the attribute table.
fn batch_shapes(array: &dyn Array, field: &Field, out: &mut Vec<MultiPolygon<f64>>) -> Result<()> {
    match GeoArrowType::try_from(field)? {
        GeoArrowType::MultiPolygon(_) => {
            for item in MultiPolygonArray::try_from((array, field))?.iter() {
                out.push(item.transpose()?.map(|shape| shape.to_multi_polygon()).unwrap_or_else(|| MultiPolygon(Vec::new())));
            }
        }
        GeoArrowType::Polygon(_) => {
            for item in PolygonArray::try_from((array, field))?.iter() {
                out.push(MultiPolygon(item.transpose()?.map(|shape| shape.to_polygon()).into_iter().collect()));
            }
        }
        GeoArrowType::Geometry(_) => {
            for item in GeometryArray::try_from((array, field))?.iter() {
                out.push(match item.transpose()?.map(|shape| shape.to_geometry()) {
                    None => MultiPolygon(Vec::new()),
                    Some(Geometry::Polygon(polygon)) => MultiPolygon(vec![polygon]),
                    Some(Geometry::MultiPolygon(shape)) => shape,
                    Some(_) => bail!("[io::geoparquet::read] Row {} is not polygonal", out.len()),
                });
            }
        }
        other => bail!("[io::geoparquet::read] Unsupported geometry type {other:?} (expected polygons)"),
    }
    Ok(())
}

/// Read a GeoParquet file from memory.
pub(crate) fn read_geoparquet_bytes(bytes: Bytes) -> Result<GeoTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())
        .context("[io::geoparquet::read] Not a Parquet file")?;

    let gp_meta = builder
        .geoparquet_metadata()
        .ok_or_else(|| anyhow!("[io::geoparquet::read] Not a GeoParquet file (missing 'geo' metadata)"))??;

    let primary = gp_meta.primary_column.clone();
    let crs = match gp_meta.columns.get(&primary).and_then(|column| column.crs.as_ref()) {
        Some(value) => Crs::from_projjson(value)?,
        None => Crs::Geographic,
    };

    // Attributes are every column the 'geo' metadata does not claim.
    let attributes: Vec<String> = builder.schema().fields().iter()
        .map(|field| field.name().clone())
        .filter(|name| !gp_meta.columns.contains_key(name))
        .collect();

    let ga_schema = builder.geoarrow_schema(&gp_meta, /*parse_to_geoarrow=*/ true, Default::default())?;
    let geom_idx = ga_schema.index_of(&primary)
        .with_context(|| format!("[io::geoparquet::read] Missing geometry column {primary}"))?;

    let parquet_reader = builder.with_batch_size(64 * 1024).build()?;
    let geo_reader = GeoParquetRecordBatchReader::try_new(parquet_reader, ga_schema)?;

    let mut shapes = Vec::new();
    for batch in geo_reader {
        let batch = batch?;
        let schema = batch.schema();
        batch_shapes(batch.column(geom_idx).as_ref(), schema.field(geom_idx), &mut shapes)?;
    }

    let data = ParquetReader::new(Cursor::new(bytes.as_ref()))
        .with_columns(Some(attributes))
        .finish()
        .context("[io::geoparquet::read] Failed to read attribute columns")?;

    let shapes = reproject_to_geographic(shapes, crs)?;
    Ok(GeoTable { data, shapes })
}

/// Read a GeoParquet file from disk.
pub(crate) fn read_geoparquet_file(path: &Path) -> Result<GeoTable> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("[io::geoparquet::read] Failed to open {}", path.display()))?;
    read_geoparquet_bytes(Bytes::from(bytes))
        .with_context(|| format!("[io::geoparquet::read] Failed to read {}", path.display()))
}
