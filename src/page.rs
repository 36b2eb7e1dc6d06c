use std::fmt::Write;

use anyhow::Result;

use crate::{
    error::NoticeLevel,
    indicator::HEAT_RISK_LEVELS,
    io::svg::escape_xml,
    map::{leaflet_head, render_map_fragment},
    pipeline::DashboardView,
};

pub const PAGE_TITLE: &str = "Heat Risk and Health Index Dashboard";

pub const DATA_SOURCES: [(&str, &str); 2] = [
    ("NWS Heat Risk", "https://www.wpc.ncep.noaa.gov/heatrisk/"),
    ("CDC Heat and Health Index", "https://ephtracking.cdc.gov/Applications/heatTracker/"),
];

const STYLE: &str = "\
body { font-family: sans-serif; margin: 0; display: flex; color: #111827; }
aside { width: 320px; padding: 16px; background: #f3f4f6; min-height: 100vh; box-sizing: border-box; }
main { padding: 16px 24px 96px; }
.notice { padding: 8px 12px; margin: 8px 0; border-radius: 4px; }
.notice.info { background: #dbeafe; }
.notice.warning { background: #fef3c7; }
.notice.error { background: #fee2e2; }
.footer { position: fixed; right: 0; bottom: 0; width: 30%; background: #f1f1f1; text-align: center; padding: 10px; font-size: 13px; }
details { margin: 8px 0; }
";

const FOOTER: &str = "\
<div class=\"footer\">This is an experimental prototype provided for informational purposes only by the \
<a href=\"https://urbantech.cornell.edu/\" target=\"_blank\">Jacobs Urban Tech Hub</a> as part of the \
<a href=\"https://agingandadaptation.cornell.edu/\" target=\"_blank\">Cornell Initiative on Aging and Adaptation to Extreme Heat</a>. \
Questions? Comments? Contact us at <a href=\"mailto:urbantech@cornell.edu\">urbantech@cornell.edu</a>.</div>";

/// A read-only drop-down with a leading "-" entry for "none selected".
fn write_choice(html: &mut String, label: &str, options: &[String], selected: Option<&str>) -> Result<()> {
    let mark = |on: bool| if on { " selected" } else { "" };
    writeln!(html, "<p><b>{label}</b><br><select disabled>")?;
    writeln!(html, "<option{}>-</option>", mark(selected.is_none()))?;
    for option in options {
        writeln!(html, "<option{}>{}</option>", mark(selected == Some(option.as_str())), escape_xml(option))?;
    }
    writeln!(html, "</select></p>")?;
    Ok(())
}

fn write_sidebar(html: &mut String, view: &DashboardView) -> Result<()> {
    let selection = &view.selection;
    writeln!(html, "<aside>")?;
    writeln!(html, "<h2>Controls</h2>")?;

    writeln!(html, "<p><b>Day</b><br>")?;
    for option in &view.day_options {
        let marker = if option.label() == selection.day { "&#9679;" } else { "&#9675;" };
        writeln!(html, "{marker} {}<br>", option)?;
    }
    writeln!(html, "</p>")?;

    if let Some(indicator) = &view.indicator {
        writeln!(html, "<p><b>HHI Indicator</b><br>{}</p>", escape_xml(&indicator.display))?;
        writeln!(html, "<details><summary>Learn more about this HHI Indicator</summary><p><b>{}</b>:<br>{}</p></details>",
            escape_xml(&indicator.column), escape_xml(view.description.as_deref().unwrap_or_default()))?;
    }

    let levels = selection.levels.iter().map(u8::to_string).collect::<Vec<_>>().join(", ");
    writeln!(html, "<p><b>Heat Risk Levels</b><br>{levels}</p>")?;
    writeln!(html, "<details><summary>Learn more about heat risk levels</summary><ul>")?;
    for level in &HEAT_RISK_LEVELS {
        writeln!(html, "<li><b>{}:</b> {} - {}</li>", level.level, level.name, escape_xml(level.description))?;
    }
    writeln!(html, "</ul></details>")?;

    writeln!(html, "<p><b>Heat Health Index Percentile Threshold</b><br>{}</p>", selection.percentile)?;
    let region = selection.region();
    write_choice(html, "State", &view.state_options, region.state)?;
    write_choice(html, "County", &view.county_options, region.county)?;
    let zip = selection.zip.trim();
    if !zip.is_empty() {
        writeln!(html, "<p><b>ZIP Code</b><br>{}</p>", escape_xml(zip))?;
    }
    writeln!(html, "<p><b>Map Size</b><br>{}</p>", selection.map_size.to_str())?;

    writeln!(html, "<p><b>Data Sources:</b></p><ul>")?;
    for (name, url) in DATA_SOURCES {
        writeln!(html, "<li><a href=\"{url}\" target=\"_blank\">{name}</a></li>")?;
    }
    writeln!(html, "</ul>")?;
    writeln!(html, "</aside>")?;
    Ok(())
}

fn write_notices(html: &mut String, view: &DashboardView, levels: &[NoticeLevel]) -> Result<()> {
    for notice in view.notices.iter().filter(|n| levels.contains(&n.level)) {
        writeln!(html, "<div class=\"notice {}\">{}</div>", notice.level.to_str(), escape_xml(&notice.message))?;
    }
    Ok(())
}

/// Render the complete dashboard as one HTML document.
pub fn render_page(view: &DashboardView) -> Result<String> {
    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\"/>")?;
    writeln!(html, "<title>{PAGE_TITLE}</title>")?;
    html.push_str(&leaflet_head());
    writeln!(html, "<style>\n{STYLE}</style>\n</head>\n<body>")?;

    write_sidebar(&mut html, view)?;

    writeln!(html, "<main>")?;
    writeln!(html, "<h1>{PAGE_TITLE}</h1>")?;
    write_notices(&mut html, view, &[NoticeLevel::Error, NoticeLevel::Warning])?;

    if let Some(map) = &view.map {
        html.push_str(&render_map_fragment(map, view.selection.map_size, "heat-risk-map")?);
    }

    write_notices(&mut html, view, &[NoticeLevel::Info])?;

    if let Some(summary) = &view.summary {
        writeln!(html, "<h2>{}</h2>", escape_xml(&summary.title()))?;
        writeln!(html, "<p><b>Sociodemographic</b></p>")?;
        writeln!(html, "<p>{}</p>", summary.population_text())?;
        writeln!(html, "<details><summary>See detailed plot for affected population</summary>\n{}</details>",
            summary.population_chart.to_svg()?)?;
        writeln!(html, "<p>{}</p>", summary.age65_text())?;
        writeln!(html, "<details><summary>See detailed plot for affected population aged 65 and older</summary>\n{}</details>",
            summary.age65_chart.to_svg()?)?;
    }

    writeln!(html, "</main>")?;
    writeln!(html, "{FOOTER}")?;
    writeln!(html, "</body>\n</html>")?;
    Ok(html)
}
