use std::{fmt, sync::Arc};

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};

use crate::{
    boundary::{BoundaryMatch, Boundaries},
    dataset::HeatRiskLayer,
    error::{DashboardError, Notices},
    filter::GeoSelection,
    indicator::Indicator,
};

use super::threshold::{highlight_flags, percentile, PercentileMethod};

pub const ZOOM_ZIP: u8 = 13;
pub const ZOOM_COUNTY: u8 = 8;
pub const ZOOM_STATE: u8 = 6;
pub const ZOOM_DEFAULT: u8 = 4;

pub const HIGHLIGHT_COLOR: &str = "red";
pub const OTHER_COLOR: &str = "blue";

/// Rendered map dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapSize {
    #[default]
    Regular,
    Full,
}

impl MapSize {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            MapSize::Regular => (1000, 800),
            MapSize::Full => (1350, 900),
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            MapSize::Regular => "Regular",
            MapSize::Full => "Full Page",
        }
    }
}

/// Leaflet path options for one layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStyle {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    pub weight: f64,
    pub fill_opacity: f64,
}

impl PathStyle {
    fn outline(color: &str, weight: f64, fill_opacity: f64) -> Self {
        Self { color: color.to_string(), fill_color: None, weight, fill_opacity }
    }

    pub fn state() -> Self { Self::outline("green", 2.0, 0.1) }

    pub fn county() -> Self { Self::outline("yellow", 2.0, 0.7) }

    pub fn zip() -> Self { Self::outline("black", 3.0, 0.5) }

    /// Style of a dataset record.
    pub fn record(highlighted: bool) -> Self {
        let (fill, opacity) = if highlighted { (HIGHLIGHT_COLOR, 0.7) } else { (OTHER_COLOR, 0.3) };
        Self { color: "black".to_string(), fill_color: Some(fill.to_string()), weight: 0.1, fill_opacity: opacity }
    }
}

/// A boundary drawn under the records.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub name: String,
    pub shapes: Vec<MultiPolygon<f64>>,
    pub style: PathStyle,
}

impl Overlay {
    fn from_match(name: &str, area: &BoundaryMatch<'_>, style: PathStyle) -> Self {
        Self { name: name.to_string(), shapes: area.shapes().cloned().collect(), style }
    }
}

/// Every dataset record with its tooltip values and highlight flag.
#[derive(Debug, Clone)]
pub struct RecordLayer {
    pub layer: Arc<HeatRiskLayer>,
    pub values: Vec<Option<f64>>,
    pub highlight: Vec<bool>,
    /// Tooltip label of the indicator value.
    pub alias: String,
}

impl RecordLayer {
    pub fn highlighted_count(&self) -> usize { self.highlight.iter().filter(|&&h| h).count() }
}

/// Fixed legend explaining the two record colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Legend {
    pub levels: Vec<u8>,
    pub percentile: u8,
}

impl Legend {
    pub fn highlighted_label(&self) -> String {
        let levels = self.levels.iter().map(u8::to_string).collect::<Vec<_>>().join(", ");
        format!("Highlighted Areas (Heat Risk [{levels}] & HHI {}th percentile)", self.percentile)
    }

    pub fn other_label(&self) -> &'static str { "Other Areas" }
}

impl fmt::Display for Legend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.highlighted_label(), self.other_label())
    }
}

/// Everything needed to draw the map, independent of any rendering backend.
#[derive(Debug, Clone)]
pub struct MapView {
    /// Initial center in lon/lat.
    pub center: Point<f64>,
    pub zoom: u8,
    /// Boundary overlays in draw order: state, county, ZIP.
    pub overlays: Vec<Overlay>,
    pub records: RecordLayer,
    pub legend: Legend,
    pub threshold: Option<f64>,
}

/// Inputs of one map render.
#[derive(Debug, Clone, Copy)]
pub struct MapRequest<'a> {
    pub indicator: &'a Indicator,
    /// Accepted risk levels, sorted.
    pub levels: &'a [u8],
    pub percentile: u8,
    pub method: PercentileMethod,
    pub region: GeoSelection<'a>,
    /// A validated five-digit ZIP Code.
    pub zip: Option<&'a str>,
}

/// Build the map for `request`.
///
/// The percentile threshold is taken over the whole dataset, not the
/// filtered view. Missing boundaries are reported to `notices` and the map
/// is built without them.
pub fn build_map(
    layer: &Arc<HeatRiskLayer>,
    boundaries: &Boundaries,
    request: &MapRequest<'_>,
    notices: &mut Notices,
) -> Result<MapView, DashboardError> {
    if layer.is_empty() {
        return Err(DashboardError::EmptyResult("The data is empty. Please check your inputs.".into()));
    }

    let values = layer.values(&request.indicator.column)
        .map_err(|e| DashboardError::InvalidSelection(format!("{e:#}")))?;
    let threshold = percentile(&values, request.percentile, request.method);
    if threshold.is_none() {
        notices.warn(format!("{} has no values; nothing is highlighted.", request.indicator.display));
    }
    let highlight = highlight_flags(&values, layer.risk_levels(), threshold, request.levels);

    let state = request.region.state.and_then(|name| {
        let found = boundaries.find_state(name);
        if found.is_none() {
            notices.report(&DashboardError::GeometryNotFound { what: "state", name: name.to_string() });
        }
        found.map(|area| (name, area))
    });

    // The county overlay needs its state.
    let county = match (request.region.county, &state) {
        (Some(county), Some((state_name, _))) => {
            let found = boundaries.find_county(state_name, county);
            if found.is_none() {
                notices.report(&DashboardError::GeometryNotFound { what: "county", name: format!("{county}, {state_name}") });
            }
            found.map(|area| (county, area))
        }
        _ => None,
    };

    let zip = request.zip.and_then(|code| {
        let found = boundaries.find_zip(code);
        if found.is_none() {
            notices.warn(format!("ZIP Code {code} was not found."));
        }
        found.map(|area| (code, area))
    });

    let records_center = || layer.geoms().mean_centroid(0..layer.len());
    let (center, zoom) = zip.as_ref().and_then(|(_, area)| area.centroid()).map(|c| (Some(c), ZOOM_ZIP))
        .or_else(|| county.as_ref().and_then(|(_, area)| area.centroid()).map(|c| (Some(c), ZOOM_COUNTY)))
        .or_else(|| state.as_ref().and_then(|(_, area)| area.centroid()).map(|c| (Some(c), ZOOM_STATE)))
        .unwrap_or_else(|| (records_center(), ZOOM_DEFAULT));
    let center = center.unwrap_or_else(|| Point::new(0.0, 0.0));

    let mut overlays = Vec::new();
    if let Some((name, area)) = &state { overlays.push(Overlay::from_match(name, area, PathStyle::state())) }
    if let Some((name, area)) = &county { overlays.push(Overlay::from_match(name, area, PathStyle::county())) }
    if let Some((code, area)) = &zip { overlays.push(Overlay::from_match(code, area, PathStyle::zip())) }

    let records = RecordLayer {
        layer: layer.clone(),
        values,
        highlight,
        alias: request.indicator.alias().to_string(),
    };
    tracing::debug!("[map] threshold {threshold:?}, {} of {} records highlighted", records.highlighted_count(), layer.len());

    Ok(MapView {
        center,
        zoom,
        overlays,
        records,
        legend: Legend { levels: request.levels.to_vec(), percentile: request.percentile },
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        boundary::tests::boundaries,
        dataset::{tests::layer, OVERALL_SCORE_COLUMN},
        error::NoticeLevel,
    };

    fn indicator() -> Indicator {
        Indicator { column: OVERALL_SCORE_COLUMN.into(), display: "Overall Score".into() }
    }

    fn request<'a>(indicator: &'a Indicator, region: GeoSelection<'a>, zip: Option<&'a str>) -> MapRequest<'a> {
        MapRequest { indicator, levels: &[2], percentile: 60, method: PercentileMethod::Lower, region, zip }
    }

    #[test]
    fn highlights_match_percentile_and_levels() {
        let layer = Arc::new(layer(&[0, 1, 2, 2, 2], &[1.0, 2.0, 3.0, 4.0, 5.0]));
        let indicator = indicator();
        let mut notices = Notices::new();

        let view = build_map(&layer, &boundaries(), &request(&indicator, GeoSelection::default(), None), &mut notices).unwrap();
        assert_eq!(view.threshold, Some(3.0));
        assert_eq!(view.records.highlight, vec![false, false, true, true, true]);
        assert_eq!(view.zoom, ZOOM_DEFAULT);
        assert!(view.overlays.is_empty());
        assert!(notices.is_empty());
        assert_eq!(view.legend.highlighted_label(), "Highlighted Areas (Heat Risk [2] & HHI 60th percentile)");
        assert_eq!(view.records.alias, "OVERALL_SCORE");
    }

    #[test]
    fn zoom_follows_the_most_specific_area() {
        let layer = Arc::new(layer(&[2, 2], &[1.0, 2.0]));
        let indicator = indicator();
        let b = boundaries();
        let mut notices = Notices::new();

        let state = build_map(&layer, &b, &request(&indicator, GeoSelection::new(Some("Alpha"), None), None), &mut notices).unwrap();
        assert_eq!((state.zoom, state.center), (ZOOM_STATE, Point::new(5.0, 5.0)));

        let county = build_map(&layer, &b, &request(&indicator, GeoSelection::new(Some("Alpha"), Some("Lake")), None), &mut notices).unwrap();
        assert_eq!((county.zoom, county.center), (ZOOM_COUNTY, Point::new(1.5, 1.5)));
        assert_eq!(county.overlays.len(), 2);

        let zip = build_map(&layer, &b, &request(&indicator, GeoSelection::new(Some("Alpha"), Some("Lake")), Some("01001")), &mut notices).unwrap();
        assert_eq!((zip.zoom, zip.center), (ZOOM_ZIP, Point::new(1.0, 1.0)));
        assert_eq!(zip.overlays.iter().map(|o| o.style.color.as_str()).collect::<Vec<_>>(), vec!["green", "yellow", "black"]);
        assert!(notices.is_empty());
    }

    #[test]
    fn missing_state_still_renders() {
        let layer = Arc::new(layer(&[2], &[1.0]));
        let indicator = indicator();
        let mut notices = Notices::new();

        let view = build_map(&layer, &boundaries(), &request(&indicator, GeoSelection::new(Some("Gamma"), Some("Lake")), Some("99999")), &mut notices).unwrap();
        assert_eq!(view.zoom, ZOOM_DEFAULT);
        assert!(view.overlays.is_empty());
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Warning));
    }

    #[test]
    fn unknown_indicator_column_is_rejected() {
        let layer = Arc::new(layer(&[2], &[1.0]));
        let indicator = Indicator { column: "weighted_NOPE".into(), display: "Nope".into() };
        let mut notices = Notices::new();
        let result = build_map(&layer, &boundaries(), &request(&indicator, GeoSelection::default(), None), &mut notices);
        assert!(matches!(result, Err(DashboardError::InvalidSelection(_))));
    }
}
