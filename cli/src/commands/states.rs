use anyhow::Result;
use heatrisk::Boundaries;

pub fn run(cli: &crate::cli::Cli) -> Result<()> {
    let config = super::load_config(cli)?;
    let boundaries = Boundaries::load(&config)?;

    for name in boundaries.state_names() {
        println!("{name}");
    }
    Ok(())
}
