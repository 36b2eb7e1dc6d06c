use anyhow::{bail, Result};
use heatrisk::Boundaries;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::CountiesArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let boundaries = Boundaries::load(&config)?;

    let state = args.state.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if let Some(state) = state {
        if boundaries.find_state(state).is_none() {
            bail!("[counties] Unknown state {state:?}");
        }
    }

    for name in boundaries.county_names(state) {
        println!("{name}");
    }
    Ok(())
}
