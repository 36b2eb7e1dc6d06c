//! GeoJSON geometry and feature helpers.

use geo::MultiPolygon;
use serde_json::{json, Map, Value};

/// Convert a MultiPolygon to a GeoJSON geometry object.
pub(crate) fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Value> = mp.0.iter()
        .map(|polygon| {
            let rings: Vec<Vec<[f64; 2]>> = std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
                .collect();
            json!(rings)
        })
        .collect();

    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}

/// A GeoJSON Feature with the given geometry and properties.
pub(crate) fn feature(mp: &MultiPolygon<f64>, properties: Map<String, Value>) -> Value {
    json!({
        "type": "Feature",
        "geometry": multipolygon_to_geojson(mp),
        "properties": properties,
    })
}

pub(crate) fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}
