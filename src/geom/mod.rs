mod bbox;
mod geom;
mod proj;

use bbox::BoundingBox;
pub use geom::Geometries;
pub use proj::Crs;
pub(crate) use proj::reproject_to_geographic;
