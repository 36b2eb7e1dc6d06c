use anyhow::Result;
use heatrisk::{day::today_in, DatasetCache, IndicatorCatalog, IndicatorDictionary};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::IndicatorsArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let dictionary = IndicatorDictionary::from_csv(&config.dictionary_path())?;
    let cache = DatasetCache::new(super::dataset_source(cli, &config)?, config.cache_ttl());

    let layer = cache.get(&args.day, today_in(config.tz()?), std::time::Instant::now())?;
    let catalog = IndicatorCatalog::from_columns(&layer.column_names());

    for indicator in catalog.iter() {
        println!("{}\t{}\t{}", indicator.column, indicator.display, dictionary.describe(&indicator.column));
    }
    Ok(())
}
