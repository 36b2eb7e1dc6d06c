use std::sync::Arc;

use crate::{
    boundary::{BoundaryMatch, Boundaries},
    dataset::{FilteredView, HeatRiskLayer},
    error::DashboardError,
};

/// Geographic part of a selection. Blank names count as unselected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeoSelection<'a> {
    pub state: Option<&'a str>,
    pub county: Option<&'a str>,
}

impl<'a> GeoSelection<'a> {
    pub fn new(state: Option<&'a str>, county: Option<&'a str>) -> Self {
        let clean = |name: Option<&'a str>| name.map(str::trim).filter(|name| !name.is_empty());
        Self { state: clean(state), county: clean(county) }
    }

    #[inline] pub fn is_empty(&self) -> bool { self.state.is_none() && self.county.is_none() }
}

/// Which boundary rows a selection resolves to.
#[derive(Debug, Clone)]
pub enum Region<'b> {
    /// Nothing selected.
    Everywhere,
    State(BoundaryMatch<'b>),
    County(BoundaryMatch<'b>),
}

/// Resolve the selection against the boundary sets. County wins over state.
pub fn resolve_region<'b>(boundaries: &'b Boundaries, selection: GeoSelection<'_>) -> Result<Region<'b>, DashboardError> {
    match (selection.state, selection.county) {
        (None, None) => Ok(Region::Everywhere),
        (Some(state), Some(county)) => boundaries.find_county(state, county)
            .map(Region::County)
            .ok_or_else(|| DashboardError::GeometryNotFound { what: "county", name: format!("{county}, {state}") }),
        (None, Some(county)) => Err(DashboardError::GeometryNotFound { what: "county", name: county.to_string() }),
        (Some(state), None) => boundaries.find_state(state)
            .map(Region::State)
            .ok_or_else(|| DashboardError::GeometryNotFound { what: "state", name: state.to_string() }),
    }
}

/// Rows of `layer` intersecting any shape of `area`, ascending.
pub fn intersecting_rows(layer: &HeatRiskLayer, area: &BoundaryMatch<'_>) -> Vec<usize> {
    let mut rows: Vec<usize> = area.shapes()
        .flat_map(|shape| layer.geoms().intersecting(shape))
        .collect();
    rows.sort_unstable();
    rows.dedup();
    rows
}

/// Restrict the dataset to the selected state or county.
///
/// A selection that matches no boundary yields an empty view plus the
/// error describing why; it never fails outright.
pub fn filter_by_geography(
    layer: &Arc<HeatRiskLayer>,
    boundaries: &Boundaries,
    selection: GeoSelection<'_>,
) -> (FilteredView, Option<DashboardError>) {
    match resolve_region(boundaries, selection) {
        Ok(Region::Everywhere) => (FilteredView::all(layer.clone()), None),
        Ok(Region::State(area) | Region::County(area)) => {
            let rows = intersecting_rows(layer, &area);
            tracing::debug!("[filter] {} of {} records intersect the selected {}", rows.len(), layer.len(), area.kind().to_str());
            (FilteredView::new(layer.clone(), rows), None)
        }
        Err(err) => (FilteredView::empty(layer.clone()), Some(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{boundary::tests::boundaries, dataset::tests::layer};

    // Records are unit cells at x = 0, 2, 4, .. along y in [0, 1].
    fn records(n: usize) -> Arc<HeatRiskLayer> {
        Arc::new(layer(&vec![2_i64; n], &vec![1.0; n]))
    }

    #[test]
    fn no_selection_passes_everything_through() {
        let layer = records(3);
        let (view, err) = filter_by_geography(&layer, &boundaries(), GeoSelection::new(Some("  "), None));
        assert!(err.is_none());
        assert_eq!(view.indices(), &[0, 1, 2]);
    }

    #[test]
    fn state_filter_returns_intersecting_subset() {
        // Alpha covers x in [0, 10]: cells at 0..8 plus the cell at 10 touching its edge.
        let layer = records(8);
        let (view, err) = filter_by_geography(&layer, &boundaries(), GeoSelection::new(Some("Alpha"), None));
        assert!(err.is_none());
        assert_eq!(view.indices(), &[0, 1, 2, 3, 4, 5]);
        assert!(view.indices().iter().all(|&i| i < layer.len()));
    }

    #[test]
    fn county_takes_precedence_over_state() {
        let layer = records(8);
        let (view, _) = filter_by_geography(&layer, &boundaries(), GeoSelection::new(Some("Alpha"), Some("Lake")));
        // Alpha's Lake county covers x in [0, 3].
        assert_eq!(view.indices(), &[0, 1]);

        let (view, _) = filter_by_geography(&layer, &boundaries(), GeoSelection::new(Some("Beta"), Some("Lake")));
        assert!(view.is_empty());
    }

    #[test]
    fn unknown_region_is_empty_not_fatal() {
        let layer = records(3);
        for selection in [
            GeoSelection::new(Some("Gamma"), Some("Nowhere")),
            GeoSelection::new(None, Some("Lake")),
            GeoSelection::new(Some("Gamma"), None),
        ] {
            let (view, err) = filter_by_geography(&layer, &boundaries(), selection);
            assert!(view.is_empty());
            assert!(matches!(err, Some(DashboardError::GeometryNotFound { .. })));
        }
    }

    #[test]
    fn filtering_is_idempotent() {
        let layer = records(8);
        let selection = GeoSelection::new(Some("Alpha"), None);
        let (a, _) = filter_by_geography(&layer, &boundaries(), selection);
        let (b, _) = filter_by_geography(&layer, &boundaries(), selection);
        assert_eq!(a.indices(), b.indices());
    }
}
