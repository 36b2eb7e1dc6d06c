//! IO module for format-specific reading and writing operations.
//!
//! - `csv` - indicator dictionary input, filtered-view export
//! - `geoparquet` - daily dataset and boundary input, filtered-view export
//! - `geojson` - GeoJSON features for map layers and export
//! - `svg` - SVG charts

pub(crate) mod csv;
pub(crate) mod geojson;
pub(crate) mod geoparquet;
pub(crate) mod svg;
