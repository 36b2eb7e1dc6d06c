use std::{path::{Path, PathBuf}, time::Duration};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::map::PercentileMethod;

pub const DEFAULT_BASE_URL: &str = "https://heat-risk-dashboard.s3.amazonaws.com";

/// Runtime configuration, read from a JSON file or left at defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object store the daily datasets are fetched from.
    pub base_url: String,
    /// Directory holding the boundary files and the indicator dictionary.
    pub data_dir: PathBuf,
    pub states_file: String,
    pub counties_file: String,
    pub zipcodes_file: String,
    pub dictionary_file: String,
    /// How long a fetched dataset is reused before it is fetched again.
    pub cache_ttl_secs: u64,
    /// IANA timezone "today" is evaluated in.
    pub timezone: String,
    pub fetch_timeout_secs: Option<u64>,
    pub percentile_method: PercentileMethod,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("data"),
            states_file: "us_states_reduced.parquet".to_string(),
            counties_file: "us_counties_reduced.parquet".to_string(),
            zipcodes_file: "us_zipcodes_reduced.parquet".to_string(),
            dictionary_file: "HHI_Data_Dictionary_2024.csv".to_string(),
            cache_ttl_secs: 86_400,
            timezone: "America/New_York".to_string(),
            fetch_timeout_secs: None,
            percentile_method: PercentileMethod::default(),
        }
    }
}

impl Config {
    /// Read a configuration file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        let config: Config = serde_json::from_slice(&bytes)
            .with_context(|| format!("[config] Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        anyhow::ensure!(self.cache_ttl_secs > 0, "[config] cache_ttl_secs must be positive");
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("[config] Unknown timezone {:?}: {e}", self.timezone))
    }

    #[inline] pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }

    #[inline] pub fn states_path(&self) -> PathBuf { self.data_dir.join(&self.states_file) }

    #[inline] pub fn counties_path(&self) -> PathBuf { self.data_dir.join(&self.counties_file) }

    #[inline] pub fn zipcodes_path(&self) -> PathBuf { self.data_dir.join(&self.zipcodes_file) }

    #[inline] pub fn dictionary_path(&self) -> PathBuf { self.data_dir.join(&self.dictionary_file) }
}
