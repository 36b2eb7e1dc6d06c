use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow_array::{ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType as ArrowType, Field, Schema};
use geo::MultiPolygon;
use geoarrow_array::{builder::MultiPolygonBuilder, GeoArrowArray};
use geoarrow_schema::{Dimension, MultiPolygonType};
use geoparquet::writer::{GeoParquetRecordBatchEncoder, GeoParquetWriterOptions};
use parquet::{
    arrow::ArrowWriter,
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};
use polars::{frame::DataFrame, prelude::{Column, DataType}};

/// Convert one polars column to an Arrow array, widening numerics to Int64/Float64
/// and rendering anything else as text.
fn column_to_arrow(column: &Column) -> Result<(Field, ArrayRef)> {
    let name = column.name().to_string();
    let dtype = column.dtype();

    let (arrow_type, array): (ArrowType, ArrayRef) = if dtype.is_integer() {
        let values = column.cast(&DataType::Int64)?;
        (ArrowType::Int64, Arc::new(values.i64()?.into_iter().collect::<Int64Array>()))
    } else if dtype.is_float() {
        let values = column.cast(&DataType::Float64)?;
        (ArrowType::Float64, Arc::new(values.f64()?.into_iter().collect::<Float64Array>()))
    } else if dtype == &DataType::Boolean {
        (ArrowType::Boolean, Arc::new(column.bool()?.into_iter().collect::<BooleanArray>()))
    } else {
        let values = column.cast(&DataType::String)?;
        (ArrowType::Utf8, Arc::new(values.str()?.into_iter().collect::<StringArray>()))
    };

    Ok((Field::new(name, arrow_type, true), array))
}

/// Write attributes plus a `geometry` column (lon/lat, WKB-encoded) as GeoParquet bytes.
pub(crate) fn write_geoparquet_bytes(data: &DataFrame, shapes: &[MultiPolygon<f64>]) -> Result<Vec<u8>> {
    if data.height() != shapes.len() {
        bail!("[io::geoparquet::write] {} attribute rows for {} geometries", data.height(), shapes.len());
    }
    if shapes.is_empty() {
        bail!("[io::geoparquet::write] Cannot write empty geometry array to GeoParquet");
    }
    if data.column("geometry").is_ok() {
        bail!("[io::geoparquet::write] Attribute table already has a 'geometry' column");
    }

    let (mut fields, mut columns): (Vec<Field>, Vec<ArrayRef>) = data.get_columns().iter()
        .map(column_to_arrow)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unzip();

    // No CRS in the type metadata declares OGC:CRS84.
    let geom_type = MultiPolygonType::new(Dimension::XY, Default::default());
    fields.push(geom_type.to_field("geometry", false));

    let mut builder = MultiPolygonBuilder::new(geom_type);
    builder.extend_from_geometry_iter(shapes.iter().map(Some))
        .context("[io::geoparquet::write] Failed to build MultiPolygon array")?;
    columns.push(builder.finish().to_array_ref());

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .context("[io::geoparquet::write] Failed to create RecordBatch")?;

    let gp_opts = GeoParquetWriterOptions::default();
    let mut gp_encoder = GeoParquetRecordBatchEncoder::try_new(schema.as_ref(), &gp_opts)
        .context("[io::geoparquet::write] Failed to create encoder")?;

    let writer_props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(4)?))
        .build();

    let mut out = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut out, gp_encoder.target_schema(), Some(writer_props))
        .context("[io::geoparquet::write] Failed to create ArrowWriter")?;

    let encoded = gp_encoder.encode_record_batch(&batch)
        .context("[io::geoparquet::write] Failed to encode batch")?;
    writer.write(&encoded)
        .context("[io::geoparquet::write] Failed to write batch")?;
    writer.append_key_value_metadata(gp_encoder.into_keyvalue()?);
    writer.close()
        .context("[io::geoparquet::write] Failed to finish writing")?;

    Ok(out)
}
