use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use serde_json::Value;

/// Coordinate reference system of a geometry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Longitude/latitude in degrees (CRS84, EPSG:4326, NAD83, ...).
    Geographic,
    /// A projected CRS identified by its EPSG code.
    Projected { epsg: u32 },
}

/// Geographic EPSG codes that are close enough to WGS84 lon/lat to be used as is.
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4269, 4258, 4283, 4617, 4674, 4167, 4937, 4979];

impl Crs {
    pub fn from_epsg(code: u32) -> Self {
        if GEOGRAPHIC_EPSG.contains(&code) { Crs::Geographic } else { Crs::Projected { epsg: code } }
    }

    #[inline] pub fn is_geographic(&self) -> bool { matches!(self, Crs::Geographic) }

    /// The column CRS as stored in GeoParquet metadata (PROJJSON, or "AUTH:CODE").
    /// Only the identifier is used; proj4rs needs a PROJ.4 definition to transform.
    pub(crate) fn from_projjson(value: &Value) -> Result<Self> {
        if let Some("GeographicCRS" | "GeodeticCRS") = value.get("type").and_then(Value::as_str) {
            return Ok(Crs::Geographic);
        }
        let id = match value {
            Value::String(s) => s.clone(),
            _ => match (value.pointer("/id/authority"), value.pointer("/id/code")) {
                (Some(Value::String(authority)), Some(code)) => format!("{authority}:{}", code.as_str().map_or_else(|| code.to_string(), str::to_string)),
                _ => bail!("[geom::proj] CRS has no authority id: {value}"),
            },
        };
        match id.split_once(':') {
            Some(("OGC", "CRS84")) => Ok(Crs::Geographic),
            Some(("EPSG", code)) => Ok(Self::from_epsg(code.parse()
                .with_context(|| format!("[geom::proj] Bad EPSG code {code:?}"))?)),
            _ => bail!("[geom::proj] Unsupported CRS {id:?}"),
        }
    }

    /// PROJ.4 definition for the supported projected systems.
    fn proj4(&self) -> Result<String> {
        let Crs::Projected { epsg } = *self else {
            return Ok("+proj=longlat +datum=WGS84 +no_defs +type=crs".to_string());
        };
        let def = match epsg {
            3857 | 900913 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs".to_string(),
            5070 => "+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs +type=crs".to_string(),
            2163 => "+proj=laea +lat_0=45 +lon_0=-100 +x_0=0 +y_0=0 +a=6370997 +b=6370997 +units=m +no_defs +type=crs".to_string(),
            32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs +type=crs", epsg - 32600),
            32701..=32760 => format!("+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs +type=crs", epsg - 32700),
            26901..=26923 => format!("+proj=utm +zone={} +datum=NAD83 +units=m +no_defs +type=crs", epsg - 26900),
            _ => bail!("[geom::proj] No projection definition for EPSG:{epsg}"),
        };
        Ok(def)
    }
}

/// Reproject shapes from `crs` to lon/lat degrees. Geographic input is returned unchanged.
pub(crate) fn reproject_to_geographic(shapes: Vec<MultiPolygon<f64>>, crs: Crs) -> Result<Vec<MultiPolygon<f64>>> {
    if crs.is_geographic() { return Ok(shapes) }

    let from = {
        let proj_string = crs.proj4()?;
        Proj4::from_proj_string(&proj_string)
            .map_err(|e| anyhow!("failed to build source PROJ.4 {proj_string}: {e:?}"))?
    };
    let to = {
        let proj_string = Crs::Geographic.proj4()?;
        Proj4::from_proj_string(&proj_string)
            .map_err(|e| anyhow!("failed to build target PROJ.4 {proj_string}: {e:?}"))?
    };

    // Meters in, radians out.
    shapes.iter()
        .map(|shape| shape.try_map_coords(|coord: Coord<f64>| {
            let mut point = (coord.x, coord.y, 0.0);
            transform(&from, &to, &mut point)?;
            Ok::<_, proj4rs::errors::Error>(Coord { x: point.0.to_degrees(), y: point.1.to_degrees() })
        }))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("[geom::proj] CRS transform failed: {e:?}"))
}
