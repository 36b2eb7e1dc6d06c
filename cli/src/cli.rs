use std::path::PathBuf;

use heatrisk::{ExportFormat, MapSize};

/// Heat risk × Heat and Health Index dashboard
#[derive(clap::Parser, Debug)]
#[command(name = "heatrisk", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// JSON configuration file
    #[arg(long, global = true, env = "HEATRISK_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory with boundary files and the indicator dictionary
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// Object store URL the daily datasets are fetched from
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Read daily datasets from this directory instead of the network
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub offline_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// List the selectable forecast days
    Days,

    /// List the HHI indicators of a day's dataset with their descriptions
    Indicators(IndicatorsArgs),

    /// Describe the heat risk levels
    Levels,

    /// List the state names accepted by --state
    States,

    /// List county names, optionally within one state
    Counties(CountiesArgs),

    /// Build the dashboard page (and optionally export the filtered data)
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
pub struct IndicatorsArgs {
    /// Forecast day, e.g. "Day 1"
    #[arg(long, default_value = "Day 1")]
    pub day: String,
}

#[derive(clap::Args, Debug)]
pub struct CountiesArgs {
    /// Only counties of this state
    #[arg(long)]
    pub state: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Forecast day, e.g. "Day 1"
    #[arg(long, default_value = "Day 1")]
    pub day: String,

    /// HHI indicator column or display name, defaults to the overall score
    #[arg(long)]
    pub indicator: Option<String>,

    /// Heat risk levels to highlight
    #[arg(long, value_delimiter = ',', default_value = "2,3,4", value_parser = clap::value_parser!(u8).range(0..=4))]
    pub levels: Vec<u8>,

    /// Heat Health Index percentile threshold
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub percentile: u8,

    /// State name, e.g. "New York"
    #[arg(long)]
    pub state: Option<String>,

    /// County name; requires --state
    #[arg(long)]
    pub county: Option<String>,

    /// Five-digit ZIP Code to zoom in on
    #[arg(long, default_value = "")]
    pub zip: String,

    #[arg(long, value_enum, default_value_t = MapSizeArg::Regular)]
    pub map_size: MapSizeArg,

    /// Also write the filtered records in this format
    #[arg(long, value_enum)]
    pub export: Option<ExportArg>,

    /// Output directory, defaults to "."
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum MapSizeArg {
    Regular,
    Full,
}

impl From<MapSizeArg> for MapSize {
    fn from(arg: MapSizeArg) -> Self {
        match arg {
            MapSizeArg::Regular => MapSize::Regular,
            MapSizeArg::Full => MapSize::Full,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ExportArg {
    Csv,
    Geojson,
    Geoparquet,
}

impl From<ExportArg> for ExportFormat {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::Csv => ExportFormat::Csv,
            ExportArg::Geojson => ExportFormat::GeoJson,
            ExportArg::Geoparquet => ExportFormat::GeoParquet,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn region_listing_commands_parse() {
        let cli = Cli::try_parse_from(["heatrisk", "counties", "--state", "New York"]).unwrap();
        assert!(matches!(cli.command, Commands::Counties(CountiesArgs { state: Some(ref s) }) if s == "New York"));

        let cli = Cli::try_parse_from(["heatrisk", "-v", "states", "--data-dir", "reference"]).unwrap();
        assert!(matches!(cli.command, Commands::States));
        assert_eq!(cli.data_dir, Some(PathBuf::from("reference")));
    }

    #[test]
    fn render_rejects_out_of_range_controls() {
        assert!(Cli::try_parse_from(["heatrisk", "render", "--levels", "2,5"]).is_err());
        assert!(Cli::try_parse_from(["heatrisk", "render", "--percentile", "101"]).is_err());

        let cli = Cli::try_parse_from(["heatrisk", "render", "--levels", "3,4", "--export", "csv"]).unwrap();
        let Commands::Render(args) = cli.command else { panic!("expected render") };
        assert_eq!(args.levels, vec![3, 4]);
        assert!(matches!(args.export, Some(ExportArg::Csv)));
    }
}
