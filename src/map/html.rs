use std::fmt::Write;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use crate::{
    common::format_optional,
    io::{geojson, svg::escape_xml},
};

use super::view::{MapSize, MapView, PathStyle, HIGHLIGHT_COLOR, OTHER_COLOR};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

/// `<link>`/`<script>` tags loading Leaflet.
pub fn leaflet_head() -> String {
    format!("<link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\"/>\n<script src=\"{LEAFLET_JS}\"></script>\n")
}

/// JSON safe to inline in a `<script>` element.
fn script_json(value: &Value) -> Result<String> {
    let text = serde_json::to_string(value).context("[map::html] Failed to serialize map data")?;
    Ok(text.replace("</", "<\\/"))
}

fn style_json(style: &PathStyle) -> Result<String> {
    script_json(&serde_json::to_value(style).context("[map::html] Failed to serialize style")?)
}

/// Records as a FeatureCollection carrying tooltip text and highlight flag.
fn records_geojson(view: &MapView) -> Value {
    let records = &view.records;
    let shapes = records.layer.geoms().shapes();
    let levels = records.layer.risk_levels();

    let features = (0..shapes.len())
        .map(|i| {
            let mut properties = Map::new();
            properties.insert("highlight".into(), json!(records.highlight[i]));
            properties.insert("tooltip".into(), json!(format!(
                "<b>{}</b> {}<br><b>Heat Risk Level:</b> {}",
                escape_xml(&records.alias),
                format_optional(records.values[i], 3),
                levels[i],
            )));
            geojson::feature(&shapes[i], properties)
        })
        .collect();
    geojson::feature_collection(features)
}

fn legend_html(view: &MapView) -> String {
    let swatch = |color: &str| format!(
        "<span style=\"display:inline-block;width:14px;height:14px;background:{color};margin-right:6px;vertical-align:middle\"></span>"
    );
    format!(
        "<div class=\"map-legend\" style=\"position:absolute;bottom:30px;left:30px;z-index:1000;background:white;\
         border:2px solid grey;padding:6px 10px;font-size:14px\"><b>Legend</b><br>{}{}<br>{}{}</div>",
        swatch(HIGHLIGHT_COLOR),
        escape_xml(&view.legend.highlighted_label()),
        swatch(OTHER_COLOR),
        view.legend.other_label(),
    )
}

/// Map container plus the script that draws it. Expects Leaflet to be loaded.
pub fn render_map_fragment(view: &MapView, size: MapSize, element_id: &str) -> Result<String> {
    let (width, height) = size.dimensions();
    let mut html = String::new();

    writeln!(html, "<div style=\"position:relative;width:{width}px;height:{height}px\">")?;
    writeln!(html, "<div id=\"{element_id}\" style=\"width:100%;height:100%\"></div>")?;
    writeln!(html, "{}", legend_html(view))?;
    writeln!(html, "</div>")?;

    writeln!(html, "<script>")?;
    writeln!(html, "(function () {{")?;
    writeln!(html, "  var map = L.map({:?}).setView([{}, {}], {});", element_id, view.center.y(), view.center.x(), view.zoom)?;
    writeln!(html, "  L.tileLayer({:?}, {{ maxZoom: 19, attribution: {:?} }}).addTo(map);", TILE_URL, TILE_ATTRIBUTION)?;

    for overlay in &view.overlays {
        let shapes = overlay.shapes.iter().map(geojson::multipolygon_to_geojson).collect::<Vec<_>>();
        let data = json!({ "type": "GeometryCollection", "geometries": shapes });
        writeln!(html, "  // {}", overlay.name.replace('\n', " "))?;
        writeln!(html, "  L.geoJSON({}, {{ style: {} }}).addTo(map);", script_json(&data)?, style_json(&overlay.style)?)?;
    }

    writeln!(html, "  var highlighted = {};", style_json(&PathStyle::record(true))?)?;
    writeln!(html, "  var other = {};", style_json(&PathStyle::record(false))?)?;
    writeln!(html, "  L.geoJSON({}, {{", script_json(&records_geojson(view))?)?;
    writeln!(html, "    style: function (f) {{ return f.properties.highlight ? highlighted : other; }},")?;
    writeln!(html, "    onEachFeature: function (f, layer) {{ layer.bindTooltip(f.properties.tooltip, {{ sticky: true }}); }}")?;
    writeln!(html, "  }}).addTo(map);")?;
    writeln!(html, "}})();")?;
    writeln!(html, "</script>")?;

    Ok(html)
}

/// Standalone HTML document containing only the map.
pub fn render_map_document(view: &MapView, size: MapSize) -> Result<String> {
    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n<title>Heat Risk Map</title>")?;
    html.push_str(&leaflet_head());
    writeln!(html, "</head>\n<body>")?;
    html.push_str(&render_map_fragment(view, size, "map")?);
    writeln!(html, "</body>\n</html>")?;
    Ok(html)
}
