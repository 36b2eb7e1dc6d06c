use std::path::PathBuf;

use anyhow::{bail, Result};
use heatrisk::{render_page, write_output, Dashboard, ExportFormat, UserSelection};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::RenderArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let source = super::dataset_source(cli, &config)?;
    let dashboard = Dashboard::open(config, source)?;

    let selection = UserSelection {
        day: args.day.clone(),
        indicator: args.indicator.clone(),
        levels: args.levels.clone(),
        percentile: args.percentile,
        state: args.state.clone(),
        county: args.county.clone(),
        zip: args.zip.clone(),
        map_size: args.map_size.into(),
    };
    let view = dashboard.recompute(&selection);

    let out_dir = args.output.clone().unwrap_or_else(|| PathBuf::from("."));
    let page = write_output(&out_dir.join("dashboard.html"), render_page(&view)?.as_bytes(), args.force)?;
    println!("{}", page.display());

    if let Some(format) = args.export.map(ExportFormat::from) {
        if view.filtered.is_some() {
            let path = out_dir.join(format!("filtered.{}", format.extension()));
            let path = write_output(&path, &view.export(format)?, args.force)?;
            println!("{}", path.display());
        }
    }

    if view.notices.has_errors() {
        bail!("[render] Dashboard rendered with errors");
    }
    Ok(())
}
