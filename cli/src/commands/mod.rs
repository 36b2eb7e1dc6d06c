pub mod counties;
pub mod days;
pub mod indicators;
pub mod levels;
pub mod render;
pub mod states;

use anyhow::Result;
use heatrisk::{Config, DatasetSource, DirSource, HttpSource};

use crate::cli::Cli;

/// Configuration file (or defaults) with command-line overrides applied.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir { config.data_dir = dir.clone() }
    if let Some(url) = &cli.base_url { config.base_url = url.clone() }
    config.validate()?;
    Ok(config)
}

/// Where daily datasets come from: a local mirror or the object store.
pub fn dataset_source(cli: &Cli, config: &Config) -> Result<Box<dyn DatasetSource>> {
    Ok(match &cli.offline_dir {
        Some(dir) => {
            tracing::info!("Reading datasets from {}", dir.display());
            Box::new(DirSource::new(dir.clone()))
        }
        None => {
            let timeout = config.fetch_timeout_secs.map(std::time::Duration::from_secs);
            Box::new(HttpSource::new(config.base_url.clone(), timeout)?)
        }
    })
}
