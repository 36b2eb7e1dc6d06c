use std::{path::Path, sync::LazyLock};

use anyhow::{Context, Result};
use geo::{MultiPolygon, Point};
use polars::prelude::*;
use regex::Regex;

use crate::{
    common::require_file_exists,
    config::Config,
    geom::Geometries,
    io::geoparquet::read_geoparquet_file,
};

pub const ZIP_WIDTH: usize = 5;

static ZIP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{5}$").unwrap_or_else(|e| unreachable!("static ZIP pattern: {e}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    State,
    County,
    Zip,
}

impl BoundaryKind {
    /// Column holding the feature's name or code.
    pub fn name_column(&self) -> &'static str {
        match self {
            BoundaryKind::State | BoundaryKind::County => "NAME",
            BoundaryKind::Zip => "ZCTA5CE10",
        }
    }

    /// Column holding the enclosing state's name, if the kind has one.
    pub fn parent_column(&self) -> Option<&'static str> {
        match self {
            BoundaryKind::County => Some("STATE_NAME"),
            _ => None,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            BoundaryKind::State => "state",
            BoundaryKind::County => "county",
            BoundaryKind::Zip => "ZIP Code",
        }
    }
}

/// Named boundary shapes of one kind, in lon/lat.
#[derive(Debug)]
pub struct BoundaryLayer {
    kind: BoundaryKind,
    names: Vec<String>,
    parents: Vec<Option<String>>,
    geoms: Geometries,
}

impl BoundaryLayer {
    /// Build a layer from an attribute table and one shape per row.
    pub fn from_table(kind: BoundaryKind, data: &DataFrame, shapes: Vec<MultiPolygon<f64>>) -> Result<Self> {
        anyhow::ensure!(data.height() == shapes.len(),
            "[boundary] {} rows for {} {} shapes", data.height(), shapes.len(), kind.to_str());

        let mut names = string_column(data, kind.name_column())?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect::<Vec<_>>();
        if kind == BoundaryKind::Zip {
            names.iter_mut().for_each(|zip| *zip = pad_zip(zip));
        }

        let parents = match kind.parent_column() {
            Some(column) => string_column(data, column)?,
            None => vec![None; names.len()],
        };

        Ok(Self { kind, names, parents, geoms: Geometries::new(shapes) })
    }

    /// Read a boundary GeoParquet file. A missing file is an error.
    pub fn load(kind: BoundaryKind, path: &Path) -> Result<Self> {
        require_file_exists(path)?;
        let table = read_geoparquet_file(path)
            .with_context(|| format!("[boundary] Failed to load {} boundaries", kind.to_str()))?;
        let layer = Self::from_table(kind, &table.data, table.shapes)?;
        tracing::info!("[boundary] Loaded {} {} boundaries from {}", layer.len(), layer.kind.to_str(), path.display());
        Ok(layer)
    }

    #[inline] pub fn kind(&self) -> BoundaryKind { self.kind }

    #[inline] pub fn len(&self) -> usize { self.names.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.names.is_empty() }

    #[inline] pub fn name(&self, row: usize) -> &str { &self.names[row] }

    #[inline] pub fn parent(&self, row: usize) -> Option<&str> { self.parents[row].as_deref() }

    #[inline] pub fn geoms(&self) -> &Geometries { &self.geoms }

    fn matching(&self, pred: impl Fn(usize) -> bool) -> Option<BoundaryMatch<'_>> {
        let rows: Vec<usize> = (0..self.len()).filter(|&row| pred(row)).collect();
        (!rows.is_empty()).then_some(BoundaryMatch { layer: self, rows })
    }

    /// Distinct names, sorted.
    fn distinct_names(&self, pred: impl Fn(usize) -> bool) -> Vec<&str> {
        let mut names: Vec<&str> = (0..self.len())
            .filter(|&row| pred(row))
            .map(|row| self.name(row))
            .filter(|name| !name.is_empty())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Rows of a boundary layer selected by name.
#[derive(Debug, Clone)]
pub struct BoundaryMatch<'a> {
    layer: &'a BoundaryLayer,
    rows: Vec<usize>,
}

impl<'a> BoundaryMatch<'a> {
    #[inline] pub fn kind(&self) -> BoundaryKind { self.layer.kind }

    #[inline] pub fn rows(&self) -> &[usize] { &self.rows }

    pub fn shapes(&self) -> impl Iterator<Item = &'a MultiPolygon<f64>> + '_ {
        self.rows.iter().map(|&row| &self.layer.geoms.shapes()[row])
    }

    /// Mean of the matched shapes' centroids.
    pub fn centroid(&self) -> Option<Point<f64>> {
        self.layer.geoms.mean_centroid(self.rows.iter().copied())
    }
}

/// State, county and ZIP Code boundaries, loaded once per dashboard.
#[derive(Debug)]
pub struct Boundaries {
    states: BoundaryLayer,
    counties: BoundaryLayer,
    zips: BoundaryLayer,
}

impl Boundaries {
    pub fn new(states: BoundaryLayer, counties: BoundaryLayer, zips: BoundaryLayer) -> Self {
        debug_assert_eq!(states.kind(), BoundaryKind::State);
        debug_assert_eq!(counties.kind(), BoundaryKind::County);
        debug_assert_eq!(zips.kind(), BoundaryKind::Zip);
        Self { states, counties, zips }
    }

    /// Load all three layers from the configured data directory.
    pub fn load(config: &Config) -> Result<Self> {
        Ok(Self::new(
            BoundaryLayer::load(BoundaryKind::State, &config.states_path())?,
            BoundaryLayer::load(BoundaryKind::County, &config.counties_path())?,
            BoundaryLayer::load(BoundaryKind::Zip, &config.zipcodes_path())?,
        ))
    }

    #[inline] pub fn states(&self) -> &BoundaryLayer { &self.states }

    #[inline] pub fn counties(&self) -> &BoundaryLayer { &self.counties }

    #[inline] pub fn zips(&self) -> &BoundaryLayer { &self.zips }

    pub fn state_names(&self) -> Vec<&str> {
        self.states.distinct_names(|_| true)
    }

    /// County names, restricted to `state` when one is given.
    pub fn county_names(&self, state: Option<&str>) -> Vec<&str> {
        self.counties.distinct_names(|row| state.is_none_or(|s| self.counties.parent(row) == Some(s)))
    }

    pub fn find_state(&self, name: &str) -> Option<BoundaryMatch<'_>> {
        self.states.matching(|row| self.states.name(row) == name)
    }

    /// County rows matching both the state and the county name.
    pub fn find_county(&self, state: &str, county: &str) -> Option<BoundaryMatch<'_>> {
        self.counties.matching(|row| {
            self.counties.name(row) == county && self.counties.parent(row) == Some(state)
        })
    }

    /// Rows whose ZIP Code equals `zip` exactly. `zip` should come from [`normalize_zip`].
    pub fn find_zip(&self, zip: &str) -> Option<BoundaryMatch<'_>> {
        self.zips.matching(|row| self.zips.name(row) == zip)
    }
}

/// Trim user ZIP input. `Ok(None)` for blank input, `Err` with the trimmed
/// text when it is not five digits.
pub fn normalize_zip(input: &str) -> Result<Option<&str>, &str> {
    let zip = input.trim();
    if zip.is_empty() { return Ok(None) }
    if ZIP_PATTERN.is_match(zip) { Ok(Some(zip)) } else { Err(zip) }
}

/// Left-pad numeric codes that lost their leading zeros.
fn pad_zip(code: &str) -> String {
    let code = code.trim();
    if !code.is_empty() && code.len() < ZIP_WIDTH && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{code:0>ZIP_WIDTH$}")
    } else {
        code.to_string()
    }
}

fn string_column(data: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = data.column(name)
        .with_context(|| format!("[boundary] Missing column '{name}'"))?
        .cast(&DataType::String)?;
    Ok(column.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dataset::tests::cell;

    /// Square covering `[x, x + size] × [y, y + size]`.
    pub(crate) fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        use geo::polygon;
        MultiPolygon(vec![polygon![
            (x: x, y: y), (x: x + size, y: y), (x: x + size, y: y + size), (x: x, y: y + size), (x: x, y: y),
        ]])
    }

    /// Two states side by side, each with one county and one ZIP area.
    pub(crate) fn boundaries() -> Boundaries {
        let states = DataFrame::new(vec![Column::new("NAME".into(), ["Alpha", "Beta"])]).unwrap();
        let counties = DataFrame::new(vec![
            Column::new("NAME".into(), ["Lake", "Lake"]),
            Column::new("STATE_NAME".into(), ["Alpha", "Beta"]),
        ]).unwrap();
        let zips = DataFrame::new(vec![Column::new("ZCTA5CE10".into(), [1001_i64, 20002])]).unwrap();

        Boundaries::new(
            BoundaryLayer::from_table(BoundaryKind::State, &states, vec![square(0.0, 0.0, 10.0), square(10.0, 0.0, 10.0)]).unwrap(),
            BoundaryLayer::from_table(BoundaryKind::County, &counties, vec![square(0.0, 0.0, 3.0), square(15.0, 5.0, 1.0)]).unwrap(),
            BoundaryLayer::from_table(BoundaryKind::Zip, &zips, vec![cell(0.5, 0.5), cell(12.0, 2.0)]).unwrap(),
        )
    }

    #[test]
    fn numeric_zip_codes_are_zero_padded() {
        let b = boundaries();
        assert_eq!(b.zips().name(0), "01001");
        assert!(b.find_zip("01001").is_some());
        assert!(b.find_zip("1001").is_none());
    }

    #[test]
    fn county_lookup_requires_the_parent_state() {
        let b = boundaries();
        assert_eq!(b.find_county("Beta", "Lake").unwrap().rows(), &[1]);
        assert!(b.find_county("Gamma", "Lake").is_none());
        assert_eq!(b.county_names(None), vec!["Lake"]);
        assert_eq!(b.county_names(Some("Gamma")), Vec::<&str>::new());
    }

    #[test]
    fn state_centroid_is_shape_center() {
        let b = boundaries();
        let alpha = b.find_state("Alpha").unwrap();
        assert_eq!(alpha.centroid(), Some(Point::new(5.0, 5.0)));
        assert_eq!(b.state_names(), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn zip_input_is_trimmed_and_checked() {
        assert_eq!(normalize_zip("  10044 "), Ok(Some("10044")));
        assert_eq!(normalize_zip("   "), Ok(None));
        assert_eq!(normalize_zip("1004"), Err("1004"));
        assert_eq!(normalize_zip("10044-1234"), Err("10044-1234"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BoundaryLayer::load(BoundaryKind::State, &dir.path().join("none.parquet")).is_err());
    }
}
