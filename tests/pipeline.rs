// End-to-end tests through the public API:
//   resource keys, indicator mapping, geographic filtering, percentile
//   highlighting, cache reuse, offline sources and exports.

use std::{sync::Arc, time::{Duration, Instant}};

use chrono::NaiveDate;
use geo::{polygon, MultiPolygon};
use polars::prelude::*;

use heatrisk::{
    dataset::{AGE65_COLUMN, OVERALL_SCORE_COLUMN, POPULATION_COLUMN, RISK_COLUMN},
    filter::{filter_by_geography, GeoSelection},
    generate_column_mapping, move_column_to_front, render_page, resource_key, Boundaries, BoundaryKind,
    BoundaryLayer, Config, Dashboard, DashboardError, DirSource, ExportFormat, HeatRiskLayer,
    IndicatorDictionary, MemSource, UserSelection,
};

fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 8, 15).unwrap() }

fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x, y: y), (x: x + size, y: y), (x: x + size, y: y + size), (x: x, y: y + size), (x: x, y: y),
    ]])
}

/// Five unit cells along the x axis at x = 0, 2, 4, 6, 8.
fn layer() -> HeatRiskLayer {
    let data = DataFrame::new(vec![
        Column::new(RISK_COLUMN.into(), [0_i64, 1, 2, 2, 2]),
        Column::new(OVERALL_SCORE_COLUMN.into(), [1.0, 2.0, 3.0, 4.0, 5.0]),
        Column::new(POPULATION_COLUMN.into(), [10.0, 20.0, 30.0, 40.0, 50.0]),
        Column::new(AGE65_COLUMN.into(), [12.0, 14.0, 16.0, 18.0, 20.0]),
        Column::new("weighted_P_POV".into(), [0.1, 0.2, 0.3, 0.4, 0.5]),
    ]).unwrap();
    HeatRiskLayer::new(data, (0..5).map(|i| square(i as f64 * 2.0, 0.0, 1.0)).collect()).unwrap()
}

/// One state covering the first three cells, with one county covering the first cell.
fn boundaries() -> Boundaries {
    let states = DataFrame::new(vec![Column::new("NAME".into(), ["Alpha"])]).unwrap();
    let counties = DataFrame::new(vec![
        Column::new("NAME".into(), ["Pine"]),
        Column::new("STATE_NAME".into(), ["Alpha"]),
    ]).unwrap();
    let zips = DataFrame::new(vec![Column::new("ZCTA5CE10".into(), ["10044"])]).unwrap();

    Boundaries::new(
        BoundaryLayer::from_table(BoundaryKind::State, &states, vec![square(-0.5, -0.5, 5.0)]).unwrap(),
        BoundaryLayer::from_table(BoundaryKind::County, &counties, vec![square(0.2, 0.2, 0.5)]).unwrap(),
        BoundaryLayer::from_table(BoundaryKind::Zip, &zips, vec![square(6.0, 0.0, 0.5)]).unwrap(),
    )
}

fn key(day: u8) -> String { resource_key(&format!("Day {day}"), today()).unwrap() }

fn mem_dashboard() -> Dashboard<Arc<MemSource>> {
    let mut source = MemSource::new();
    source.insert(key(1), layer().to_geoparquet_bytes().unwrap());
    Dashboard::from_parts(Config::default(), Arc::new(source), boundaries(), IndicatorDictionary::default()).unwrap()
}

#[test]
fn resource_key_embeds_label_and_publication_date() {
    assert_eq!(key(1), "heat_risk_analysis_Day+1_20250815.geoparquet");
    assert_eq!(key(7), "heat_risk_analysis_Day+7_20250815.geoparquet");
    assert!(matches!(resource_key("Day 0", today()), Err(DashboardError::InvalidSelection(_))));
}

#[test]
fn column_mapping_and_ordering() {
    let mapping = generate_column_mapping(&["weighted_OVERALL_SCORE", "weighted_P_AGE65", "other_col"]);
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping[0].1, "Overall Score");
    assert_eq!(mapping[1].1, "P Age65");

    let columns = vec!["weighted_POP".to_string(), "weighted_OVERALL_SCORE".to_string()];
    assert_eq!(move_column_to_front(columns.clone(), "weighted_OVERALL_SCORE")[0], "weighted_OVERALL_SCORE");
    assert_eq!(move_column_to_front(columns.clone(), "missing"), columns);
}

#[test]
fn filter_is_a_subset_and_absent_county_is_empty() {
    let layer = Arc::new(layer());
    let b = boundaries();

    let (state, err) = filter_by_geography(&layer, &b, GeoSelection::new(Some("Alpha"), None));
    assert!(err.is_none());
    assert_eq!(state.indices(), &[0, 1, 2]);

    let (county, _) = filter_by_geography(&layer, &b, GeoSelection::new(Some("Alpha"), Some("Pine")));
    assert_eq!(county.indices(), &[0]);

    let (missing, err) = filter_by_geography(&layer, &b, GeoSelection::new(Some("Omega"), Some("Nowhere")));
    assert!(missing.is_empty());
    assert!(matches!(err, Some(DashboardError::GeometryNotFound { .. })));
}

#[test]
fn percentile_highlight_is_idempotent() {
    let dashboard = mem_dashboard();
    let selection = UserSelection { levels: vec![2], percentile: 60, ..UserSelection::default() };
    let now = Instant::now();

    let first = dashboard.recompute_at(&selection, today(), now);
    let second = dashboard.recompute_at(&selection, today(), now);

    let highlight = &first.map.as_ref().unwrap().records.highlight;
    assert_eq!(highlight, &vec![false, false, true, true, true]);
    assert_eq!(highlight, &second.map.as_ref().unwrap().records.highlight);
    assert_eq!(first.filtered.unwrap().indices(), second.filtered.unwrap().indices());
}

#[test]
fn cache_fetches_once_per_ttl_window() {
    let dashboard = mem_dashboard();
    let t0 = Instant::now();
    let selection = UserSelection::default();

    dashboard.recompute_at(&selection, today(), t0);
    dashboard.recompute_at(&selection, today(), t0 + Duration::from_secs(23 * 3600));
    assert_eq!(dashboard.cache().source().fetch_count(), 1);

    dashboard.recompute_at(&selection, today(), t0 + Duration::from_secs(24 * 3600));
    assert_eq!(dashboard.cache().source().fetch_count(), 2);
}

#[test]
fn offline_directory_serves_the_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(key(2)), layer().to_geoparquet_bytes().unwrap()).unwrap();

    let dictionary = IndicatorDictionary::from_csv_str(
        "weighted_2024_VARIABLE_NAME,2024_DESCRIPTION\nweighted_P_POV,Persons below poverty\n",
    ).unwrap();
    let dashboard = Dashboard::from_parts(Config::default(), DirSource::new(dir.path()), boundaries(), dictionary).unwrap();

    let selection = UserSelection {
        day: "Day 2".into(),
        indicator: Some("P Pov".into()),
        state: Some("Alpha".into()),
        zip: " 10044 ".into(),
        ..UserSelection::default()
    };
    let view = dashboard.recompute_at(&selection, today(), Instant::now());

    assert!(!view.notices.has_errors());
    assert_eq!(view.indicator.as_ref().unwrap().column, "weighted_P_POV");
    assert_eq!(view.description.as_deref(), Some("Persons below poverty"));
    assert_eq!(view.map.as_ref().unwrap().zoom, 13);
    assert_eq!(view.summary.as_ref().unwrap().total_population, 60.0);

    let csv = String::from_utf8(view.export(ExportFormat::Csv).unwrap()).unwrap();
    assert_eq!(csv.lines().count(), 4);

    let geojson: serde_json::Value = serde_json::from_slice(&view.export(ExportFormat::GeoJson).unwrap()).unwrap();
    assert_eq!(geojson["features"].as_array().unwrap().len(), 3);

    let page = render_page(&view).unwrap();
    assert!(page.contains("Key Summary - Alpha"));
    assert!(page.contains("Affected population: 60"));
}

#[test]
fn open_requires_reference_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config { data_dir: dir.path().to_path_buf(), ..Config::default() };
    assert!(Dashboard::open(config, MemSource::new()).is_err());
}
