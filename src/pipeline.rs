use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    boundary::{normalize_zip, Boundaries},
    cache::DatasetCache,
    config::Config,
    dataset::{FilteredView, HeatRiskLayer},
    day::{day_options, normalize_day_label, today_in, DayOption},
    error::{DashboardError, Notices},
    filter::{filter_by_geography, GeoSelection},
    indicator::{Indicator, IndicatorCatalog, IndicatorDictionary},
    map::{build_map, check_levels, check_percentile, MapRequest, MapSize, MapView},
    source::DatasetSource,
    summary::{summarize, KeySummary, SELECT_REGION_MESSAGE},
};

pub const DEFAULT_LEVELS: [u8; 3] = [2, 3, 4];
pub const DEFAULT_PERCENTILE: u8 = 80;

/// Every user-facing control of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSelection {
    /// `Day N` or a full `Day N - MM/DD/YYYY` option label.
    pub day: String,
    /// Raw column or display name. None selects the overall score.
    pub indicator: Option<String>,
    pub levels: Vec<u8>,
    pub percentile: u8,
    pub state: Option<String>,
    pub county: Option<String>,
    /// Free-text ZIP Code; blank means none.
    pub zip: String,
    pub map_size: MapSize,
}

impl Default for UserSelection {
    fn default() -> Self {
        Self {
            day: "Day 1".to_string(),
            indicator: None,
            levels: DEFAULT_LEVELS.to_vec(),
            percentile: DEFAULT_PERCENTILE,
            state: None,
            county: None,
            zip: String::new(),
            map_size: MapSize::Regular,
        }
    }
}

impl UserSelection {
    pub fn region(&self) -> GeoSelection<'_> {
        GeoSelection::new(self.state.as_deref(), self.county.as_deref())
    }

    /// Heading suffix naming the selected area.
    pub fn title_suffix(&self) -> String {
        match self.region() {
            GeoSelection { state: Some(state), county: Some(county) } => format!(" - {state}, {county}"),
            GeoSelection { state: Some(state), county: None } => format!(" - {state}"),
            GeoSelection { state: None, county: Some(county) } => format!(" - {county}"),
            GeoSelection { state: None, county: None } => String::new(),
        }
    }
}

/// Data export formats for the filtered records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    GeoJson,
    GeoParquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::GeoJson => "geojson",
            ExportFormat::GeoParquet => "geoparquet",
        }
    }
}

/// Result of one pipeline run: everything the page renders.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub selection: UserSelection,
    pub today: NaiveDate,
    pub day_options: Vec<DayOption>,
    pub catalog: IndicatorCatalog,
    /// State choices, sorted.
    pub state_options: Vec<String>,
    /// County choices within the selected state; empty without one.
    pub county_options: Vec<String>,
    pub indicator: Option<Indicator>,
    pub description: Option<String>,
    pub filtered: Option<FilteredView>,
    pub map: Option<MapView>,
    pub summary: Option<KeySummary>,
    pub notices: Notices,
}

impl DashboardView {
    fn new(selection: &UserSelection, today: NaiveDate) -> Self {
        Self {
            selection: selection.clone(),
            today,
            day_options: day_options(today),
            catalog: IndicatorCatalog::default(),
            state_options: Vec::new(),
            county_options: Vec::new(),
            indicator: None,
            description: None,
            filtered: None,
            map: None,
            summary: None,
            notices: Notices::new(),
        }
    }

    /// Encode the filtered records.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>> {
        let view = self.filtered.as_ref()
            .context("[pipeline::export] No data loaded for this selection")?;
        match format {
            ExportFormat::Csv => view.to_csv_bytes(),
            ExportFormat::GeoJson => view.to_geojson_bytes(),
            ExportFormat::GeoParquet => view.to_geoparquet_bytes(),
        }
    }
}

/// Session context: the dataset cache plus reference data loaded once.
pub struct Dashboard<S> {
    config: Config,
    tz: Tz,
    cache: DatasetCache<S>,
    boundaries: Boundaries,
    dictionary: IndicatorDictionary,
}

impl<S: DatasetSource> Dashboard<S> {
    /// Load boundaries and the indicator dictionary from the configured data directory.
    pub fn open(config: Config, source: S) -> Result<Self> {
        config.validate()?;
        let boundaries = Boundaries::load(&config)
            .context("[pipeline::open] Failed to load boundary data")?;
        let dictionary = IndicatorDictionary::from_csv(&config.dictionary_path())
            .context("[pipeline::open] Failed to load the indicator dictionary")?;
        Self::from_parts(config, source, boundaries, dictionary)
    }

    pub fn from_parts(config: Config, source: S, boundaries: Boundaries, dictionary: IndicatorDictionary) -> Result<Self> {
        let tz = config.tz()?;
        let cache = DatasetCache::new(source, config.cache_ttl());
        Ok(Self { config, tz, cache, boundaries, dictionary })
    }

    #[inline] pub fn config(&self) -> &Config { &self.config }

    #[inline] pub fn boundaries(&self) -> &Boundaries { &self.boundaries }

    #[inline] pub fn dictionary(&self) -> &IndicatorDictionary { &self.dictionary }

    #[inline] pub fn cache(&self) -> &DatasetCache<S> { &self.cache }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate { today_in(self.tz) }

    pub fn dataset(&self, day: &str) -> Result<Arc<HeatRiskLayer>, DashboardError> {
        self.cache.get(day, self.today(), Instant::now())
    }

    pub fn recompute(&self, selection: &UserSelection) -> DashboardView {
        self.recompute_at(selection, self.today(), Instant::now())
    }

    /// Run the pipeline for `selection` as of `today`/`now`.
    pub fn recompute_at(&self, selection: &UserSelection, today: NaiveDate, now: Instant) -> DashboardView {
        let mut out = DashboardView::new(selection, today);
        let region = selection.region();

        out.state_options = self.boundaries.state_names().into_iter().map(str::to_string).collect();
        if let Some(state) = region.state {
            out.county_options = self.boundaries.county_names(Some(state)).into_iter().map(str::to_string).collect();
        }

        let checked = normalize_day_label(&selection.day)
            .and_then(|day| Ok((day, check_levels(&selection.levels)?)))
            .and_then(|(day, levels)| check_percentile(selection.percentile).map(|_| (day, levels)));
        let (day, levels) = match checked {
            Ok(checked) => checked,
            Err(err) => {
                out.notices.report(&err);
                return out;
            }
        };
        out.selection.day = day;
        out.selection.levels = levels;

        let layer = match self.cache.get(&out.selection.day, today, now) {
            Ok(layer) => layer,
            Err(err) => {
                out.notices.report(&err);
                return out;
            }
        };

        out.catalog = IndicatorCatalog::from_columns(&layer.column_names());
        let resolved = out.catalog.resolve(selection.indicator.as_deref())
            .map(|(indicator, warning)| (indicator.clone(), warning));
        let indicator = match resolved {
            Ok((indicator, warning)) => {
                if let Some(warning) = warning { out.notices.warn(warning) }
                indicator
            }
            Err(err) => {
                out.notices.report(&err);
                return out;
            }
        };
        out.description = Some(self.dictionary.describe(&indicator.column).to_string());

        let zip = match normalize_zip(&selection.zip) {
            Ok(zip) => zip,
            Err(bad) => {
                out.notices.warn(format!("{bad:?} is not a 5-digit ZIP Code; ignoring it."));
                None
            }
        };

        let (filtered, filter_err) = filter_by_geography(&layer, &self.boundaries, region);

        let request = MapRequest {
            indicator: &indicator,
            levels: &out.selection.levels,
            percentile: selection.percentile,
            method: self.config.percentile_method,
            region,
            zip,
        };
        match build_map(&layer, &self.boundaries, &request, &mut out.notices) {
            Ok(map) => out.map = Some(map),
            Err(err) => out.notices.report(&err),
        }

        if region.is_empty() {
            out.notices.info(SELECT_REGION_MESSAGE);
        } else {
            if let Some(err) = &filter_err { out.notices.report(err) }
            match summarize(&filtered, &selection.title_suffix()) {
                Ok(summary) => out.summary = Some(summary),
                Err(err) => out.notices.report(&err),
            }
        }

        out.indicator = Some(indicator);
        out.filtered = Some(filtered);
        out
    }
}
