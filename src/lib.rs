#![doc = "Heat risk and CDC Heat and Health Index dashboard"]
mod common;
mod geom;
mod io;

pub mod boundary;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod day;
pub mod error;
pub mod filter;
pub mod indicator;
pub mod map;
pub mod page;
pub mod pipeline;
pub mod source;
pub mod summary;

#[doc(inline)]
pub use boundary::{Boundaries, BoundaryKind, BoundaryLayer};

#[doc(inline)]
pub use cache::DatasetCache;

#[doc(inline)]
pub use config::Config;

#[doc(inline)]
pub use dataset::{FilteredView, HeatRiskLayer};

#[doc(inline)]
pub use day::{day_options, resource_key, DayOption};

#[doc(inline)]
pub use error::{DashboardError, Notice, NoticeLevel, Notices};

#[doc(inline)]
pub use geom::{Crs, Geometries};

#[doc(inline)]
pub use indicator::{generate_column_mapping, move_column_to_front, IndicatorCatalog, IndicatorDictionary};

#[doc(inline)]
pub use map::{MapSize, MapView, PercentileMethod};

#[doc(inline)]
pub use page::render_page;

#[doc(inline)]
pub use pipeline::{Dashboard, DashboardView, ExportFormat, UserSelection};

#[doc(inline)]
pub use source::{DatasetSource, DirSource, MemSource};

#[cfg(feature = "download")]
#[doc(inline)]
pub use source::HttpSource;

/// Write `bytes` to `path` atomically; refuses to replace an existing file unless `force`.
pub fn write_output(path: &std::path::Path, bytes: &[u8], force: bool) -> anyhow::Result<std::path::PathBuf> {
    common::write_atomic(path, bytes, force)
}
