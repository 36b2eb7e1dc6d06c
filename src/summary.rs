use std::io::Write;

use anyhow::Result;

use crate::{
    common::{format_number, format_optional},
    dataset::{FilteredView, AGE65_COLUMN, MAX_RISK_LEVEL, POPULATION_COLUMN},
    error::DashboardError,
    io::svg::{escape_xml, golden_angle_color, SvgStringWriter},
};

pub const NO_DATA_MESSAGE: &str = "No data available for the selected state or county.";
pub const SELECT_REGION_MESSAGE: &str = "Select a State or County to get key summaries";

/// Aggregates for one heat risk level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub level: u8,
    pub records: usize,
    /// Sum of present population values.
    pub population: f64,
    /// Mean of present age 65+ percentages.
    pub age65_mean: Option<f64>,
}

/// One horizontal bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub category: String,
    pub value: f64,
}

/// Horizontal bar chart over a string category axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<Bar>,
    pub width: f64,
    pub height: f64,
}

const MARGIN_LEFT: f64 = 110.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 44.0;
const MARGIN_BOTTOM: f64 = 52.0;
const TICKS: usize = 4;

impl BarChart {
    pub fn new(title: &str, y_label: &str, x_label: &str, bars: Vec<Bar>) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            bars,
            width: 600.0,
            height: 300.0,
        }
    }

    /// Render to a standalone SVG document.
    pub fn to_svg(&self) -> Result<String> {
        let mut svg = SvgStringWriter::new();
        svg.write_header(self.width, self.height)?;
        svg.write_styles()?;

        let plot_w = self.width - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = self.height - MARGIN_TOP - MARGIN_BOTTOM;
        let max = self.bars.iter().map(|bar| bar.value).fold(0.0_f64, f64::max);
        let max = if max > 0.0 { max } else { 1.0 };
        let scale = |v: f64| plot_w * (v.max(0.0) / max);

        writeln!(svg, r#"<text class="title" x="{}" y="24">{}</text>"#, MARGIN_LEFT, escape_xml(&self.title))?;

        for tick in 0..=TICKS {
            let value = max * tick as f64 / TICKS as f64;
            let x = MARGIN_LEFT + scale(value);
            writeln!(svg, r#"<line class="grid" x1="{x:.1}" y1="{MARGIN_TOP}" x2="{x:.1}" y2="{:.1}"/>"#, MARGIN_TOP + plot_h)?;
            writeln!(svg, r#"<text class="tick" x="{x:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                MARGIN_TOP + plot_h + 16.0, format_number(value, 2))?;
        }

        let band = plot_h / self.bars.len().max(1) as f64;
        for (i, bar) in self.bars.iter().enumerate() {
            let y = MARGIN_TOP + band * i as f64;
            writeln!(svg, r#"<rect x="{MARGIN_LEFT}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {}</title></rect>"#,
                y + band * 0.15, scale(bar.value), band * 0.7, golden_angle_color(i),
                escape_xml(&bar.category), format_number(bar.value, 2))?;
            writeln!(svg, r#"<text class="tick" x="{:.1}" y="{:.1}" text-anchor="end" dominant-baseline="middle">{}</text>"#,
                MARGIN_LEFT - 8.0, y + band / 2.0, escape_xml(&bar.category))?;
        }

        writeln!(svg, r#"<line class="axis" x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{:.1}"/>"#, MARGIN_TOP + plot_h)?;
        writeln!(svg, r#"<text class="label" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0, self.height - 12.0, escape_xml(&self.x_label))?;
        writeln!(svg, r#"<text class="label" transform="translate(18 {:.1}) rotate(-90)" text-anchor="middle">{}</text>"#,
            MARGIN_TOP + plot_h / 2.0, escape_xml(&self.y_label))?;

        svg.write_footer()?;
        svg.into_string()
    }
}

/// Key figures for the selected state or county.
#[derive(Debug, Clone)]
pub struct KeySummary {
    /// ` - State` or ` - State, County`.
    pub title_suffix: String,
    pub total_population: f64,
    pub age65_mean: Option<f64>,
    /// One entry per level present in the view, ascending.
    pub by_level: Vec<LevelSummary>,
    pub population_chart: BarChart,
    pub age65_chart: BarChart,
}

impl KeySummary {
    pub fn title(&self) -> String { format!("Key Summary{}", self.title_suffix) }

    pub fn population_text(&self) -> String {
        format!("Affected population: {}", format_number(self.total_population, 0))
    }

    pub fn age65_text(&self) -> String {
        let mean = self.age65_mean.map_or_else(|| format_optional(None, 2), |v| format!("{v:.2}"));
        format!("Percentage of persons aged 65 and older estimate: {mean}%")
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn column_values(view: &FilteredView, column: &str) -> Result<Vec<Option<f64>>, DashboardError> {
    view.values(column)
        .map_err(|_| DashboardError::EmptyResult(format!("The dataset has no '{column}' column to summarize.")))
}

/// Aggregate `view` by heat risk level.
pub fn summarize(view: &FilteredView, title_suffix: &str) -> Result<KeySummary, DashboardError> {
    if view.is_empty() {
        return Err(DashboardError::EmptyResult(NO_DATA_MESSAGE.into()));
    }

    let population = column_values(view, POPULATION_COLUMN)?;
    let age65 = column_values(view, AGE65_COLUMN)?;
    let levels: Vec<u8> = view.risk_levels().collect();

    let by_level: Vec<LevelSummary> = (0..=MAX_RISK_LEVEL)
        .filter_map(|level| {
            let rows: Vec<usize> = (0..levels.len()).filter(|&i| levels[i] == level).collect();
            if rows.is_empty() { return None }
            Some(LevelSummary {
                level,
                records: rows.len(),
                population: rows.iter().filter_map(|&i| population[i]).sum(),
                age65_mean: mean(rows.iter().filter_map(|&i| age65[i])),
            })
        })
        .collect();

    let population_chart = BarChart::new(
        "Population Affected by Heat Risk Level",
        "Heat Risk Level",
        "Affected Population",
        by_level.iter().map(|s| Bar { category: s.level.to_string(), value: s.population }).collect(),
    );
    let age65_chart = BarChart::new(
        "Percentage of Persons Aged 65 and Older by Heat Risk Level",
        "Heat Risk Level",
        "Percentage of Persons Aged 65 and Older",
        by_level.iter()
            .filter_map(|s| Some(Bar { category: s.level.to_string(), value: s.age65_mean? }))
            .collect(),
    );

    Ok(KeySummary {
        title_suffix: title_suffix.to_string(),
        total_population: population.iter().flatten().sum(),
        age65_mean: mean(age65.iter().flatten().copied()),
        by_level,
        population_chart,
        age65_chart,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use polars::prelude::*;

    use super::*;
    use crate::dataset::{tests::cell, HeatRiskLayer, RISK_COLUMN};

    fn view(rows: &[usize]) -> FilteredView {
        let data = DataFrame::new(vec![
            Column::new(RISK_COLUMN.into(), [2_i64, 3, 2, 4]),
            Column::new(POPULATION_COLUMN.into(), [Some(100.0), Some(50.0), Some(1200.0), None]),
            Column::new(AGE65_COLUMN.into(), [Some(10.0), Some(20.0), Some(14.0), Some(f64::NAN)]),
        ]).unwrap();
        let layer = HeatRiskLayer::new(data, (0..4).map(|i| cell(i as f64, 0.0)).collect()).unwrap();
        FilteredView::new(Arc::new(layer), rows.to_vec())
    }

    #[test]
    fn groups_by_level_skipping_missing_values() {
        let summary = summarize(&view(&[0, 1, 2, 3]), " - Alpha").unwrap();
        assert_eq!(summary.total_population, 1350.0);
        assert_eq!(summary.age65_mean, Some(44.0 / 3.0));
        assert_eq!(summary.by_level.iter().map(|s| s.level).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(summary.by_level[0].population, 1300.0);
        assert_eq!(summary.by_level[0].age65_mean, Some(12.0));
        assert_eq!(summary.by_level[2].age65_mean, None);

        assert_eq!(summary.title(), "Key Summary - Alpha");
        assert_eq!(summary.population_text(), "Affected population: 1,350");
        assert_eq!(summary.age65_text(), "Percentage of persons aged 65 and older estimate: 14.67%");
        assert_eq!(summary.age65_chart.bars.len(), 2);
    }

    #[test]
    fn empty_view_has_no_summary() {
        match summarize(&view(&[]), "") {
            Err(DashboardError::EmptyResult(msg)) => assert_eq!(msg, NO_DATA_MESSAGE),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn chart_svg_has_one_rect_per_bar() {
        let summary = summarize(&view(&[0, 1]), "").unwrap();
        let svg = summary.population_chart.to_svg().unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Population Affected by Heat Risk Level"));
        assert_eq!(svg.matches("<rect x=").count(), 2);
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
