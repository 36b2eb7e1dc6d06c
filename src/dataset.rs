use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use bytes::Bytes;
use geo::MultiPolygon;
use polars::prelude::*;
use serde_json::{json, Map, Value};

use crate::geom::Geometries;
use crate::io::{csv::write_csv_bytes, geojson, geoparquet};

/// Heat risk level column (0 = none .. 4 = extreme).
pub const RISK_COLUMN: &str = "raster_value";
/// Prefix shared by all weighted HHI indicator columns.
pub const WEIGHTED_PREFIX: &str = "weighted_";
pub const OVERALL_SCORE_COLUMN: &str = "weighted_OVERALL_SCORE";
pub const POPULATION_COLUMN: &str = "weighted_POP";
pub const AGE65_COLUMN: &str = "weighted_P_AGE65";

pub const MAX_RISK_LEVEL: u8 = 4;

/// One day of heat risk cells joined with weighted HHI indicators.
/// Row `i` of `data` describes the shape `geoms.shapes()[i]`.
#[derive(Debug)]
pub struct HeatRiskLayer {
    data: DataFrame,
    risk_levels: Vec<u8>,
    geoms: Geometries,
}

impl HeatRiskLayer {
    /// Build a layer from attribute rows and lon/lat shapes, validating the risk levels.
    pub fn new(data: DataFrame, shapes: Vec<MultiPolygon<f64>>) -> Result<Self> {
        ensure!(data.height() == shapes.len(),
            "[dataset] {} attribute rows for {} geometries", data.height(), shapes.len());

        let risk = data.column(RISK_COLUMN)
            .with_context(|| format!("[dataset] Missing '{RISK_COLUMN}' column"))?
            .cast(&DataType::Float64)?;

        let risk_levels = risk.f64()?.into_iter().enumerate()
            .map(|(row, value)| match value {
                Some(v) if v.fract() == 0.0 && (0.0..=MAX_RISK_LEVEL as f64).contains(&v) => Ok(v as u8),
                Some(v) => bail!("[dataset] Row {row}: {RISK_COLUMN} {v} is not a level in 0..={MAX_RISK_LEVEL}"),
                None => bail!("[dataset] Row {row}: {RISK_COLUMN} is null"),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { data, risk_levels, geoms: Geometries::new(shapes) })
    }

    /// Parse a GeoParquet payload as fetched from the object store.
    pub fn from_geoparquet_bytes(bytes: Bytes) -> Result<Self> {
        let table = geoparquet::read_geoparquet_bytes(bytes)?;
        Self::new(table.data, table.shapes)
    }

    /// Encode the layer back to GeoParquet (lon/lat, WKB).
    pub fn to_geoparquet_bytes(&self) -> Result<Vec<u8>> {
        geoparquet::write_geoparquet_bytes(&self.data, self.geoms.shapes())
    }

    #[inline] pub fn len(&self) -> usize { self.data.height() }

    #[inline] pub fn is_empty(&self) -> bool { self.data.height() == 0 }

    /// Attribute table (everything except geometry).
    #[inline] pub fn data(&self) -> &DataFrame { &self.data }

    #[inline] pub fn geoms(&self) -> &Geometries { &self.geoms }

    #[inline] pub fn risk_levels(&self) -> &[u8] { &self.risk_levels }

    pub fn column_names(&self) -> Vec<String> {
        self.data.get_column_names().iter().map(|name| name.to_string()).collect()
    }

    #[inline] pub fn has_column(&self, name: &str) -> bool { self.data.column(name).is_ok() }

    /// Numeric values of `column`; nulls and NaN become None.
    pub fn values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let values = self.data.column(column)
            .with_context(|| format!("[dataset] Missing column '{column}'"))?
            .cast(&DataType::Float64)
            .with_context(|| format!("[dataset] Column '{column}' is not numeric"))?;
        Ok(values.f64()?.into_iter().map(|v| v.filter(|v| !v.is_nan())).collect())
    }
}

/// The subset of a layer's rows selected by a geographic filter.
#[derive(Debug, Clone)]
pub struct FilteredView {
    layer: Arc<HeatRiskLayer>,
    indices: Vec<usize>,
}

impl FilteredView {
    /// Every row of the layer.
    pub fn all(layer: Arc<HeatRiskLayer>) -> Self {
        let indices = (0..layer.len()).collect();
        Self { layer, indices }
    }

    pub fn empty(layer: Arc<HeatRiskLayer>) -> Self {
        Self { layer, indices: Vec::new() }
    }

    /// `indices` must be ascending row numbers of `layer`.
    pub(crate) fn new(layer: Arc<HeatRiskLayer>, indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(indices.last().is_none_or(|&i| i < layer.len()));
        Self { layer, indices }
    }

    #[inline] pub fn layer(&self) -> &Arc<HeatRiskLayer> { &self.layer }

    #[inline] pub fn indices(&self) -> &[usize] { &self.indices }

    #[inline] pub fn len(&self) -> usize { self.indices.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.indices.is_empty() }

    /// Risk level of each selected row, in view order.
    pub fn risk_levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.indices.iter().map(|&i| self.layer.risk_levels()[i])
    }

    /// Values of `column` for the selected rows, in view order.
    pub fn values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let all = self.layer.values(column)?;
        Ok(self.indices.iter().map(|&i| all[i]).collect())
    }

    /// Attribute rows of the view.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut mask = vec![false; self.layer.len()];
        for &i in &self.indices { mask[i] = true }
        let mask = BooleanChunked::from_slice("mask".into(), &mask);
        self.layer.data().filter(&mask).context("[dataset] Failed to filter rows")
    }

    fn shapes(&self) -> Vec<MultiPolygon<f64>> {
        self.indices.iter().map(|&i| self.layer.geoms().shapes()[i].clone()).collect()
    }

    /// Attributes as CSV (geometry omitted).
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        write_csv_bytes(&self.to_frame()?)
    }

    /// Attributes and geometry as a GeoJSON FeatureCollection.
    pub fn to_geojson_bytes(&self) -> Result<Vec<u8>> {
        let frame = self.to_frame()?;
        let columns = frame.get_columns();
        let shapes = self.shapes();

        let mut features = Vec::with_capacity(shapes.len());
        for (row, shape) in shapes.iter().enumerate() {
            let mut properties = Map::new();
            for column in columns {
                properties.insert(column.name().to_string(), any_value_to_json(column.get(row)?));
            }
            features.push(geojson::feature(shape, properties));
        }

        serde_json::to_vec(&geojson::feature_collection(features))
            .context("[dataset] Failed to serialize GeoJSON")
    }

    /// Attributes and geometry as GeoParquet.
    pub fn to_geoparquet_bytes(&self) -> Result<Vec<u8>> {
        geoparquet::write_geoparquet_bytes(&self.to_frame()?, &self.shapes())
    }
}

/// JSON value for a single cell, for GeoJSON properties.
pub(crate) fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => json!(b),
        AnyValue::String(s) => json!(s),
        AnyValue::StringOwned(s) => json!(s.as_str()),
        AnyValue::Int8(v) => json!(v),
        AnyValue::Int16(v) => json!(v),
        AnyValue::Int32(v) => json!(v),
        AnyValue::Int64(v) => json!(v),
        AnyValue::UInt8(v) => json!(v),
        AnyValue::UInt16(v) => json!(v),
        AnyValue::UInt32(v) => json!(v),
        AnyValue::UInt64(v) => json!(v),
        AnyValue::Float32(v) if v.is_finite() => json!(v),
        AnyValue::Float64(v) if v.is_finite() => json!(v),
        AnyValue::Float32(_) | AnyValue::Float64(_) => Value::Null,
        other => json!(other.to_string()),
    }
}
