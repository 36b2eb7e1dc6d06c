use anyhow::Result;
use heatrisk::day::{day_options, resource_key, today_in};

pub fn run(cli: &crate::cli::Cli) -> Result<()> {
    let config = super::load_config(cli)?;
    let today = today_in(config.tz()?);

    for option in day_options(today) {
        println!("{option}\t{}", resource_key(&option.label(), today)?);
    }
    Ok(())
}
