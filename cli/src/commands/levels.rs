use anyhow::Result;
use heatrisk::indicator::HEAT_RISK_LEVELS;

pub fn run(_cli: &crate::cli::Cli) -> Result<()> {
    for level in &HEAT_RISK_LEVELS {
        println!("{}\t{}\t{}", level.level, level.name, level.description);
    }
    Ok(())
}
