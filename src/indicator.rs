use std::path::Path;

use ahash::AHashMap;
use anyhow::{Context, Result};
use polars::prelude::*;

use crate::{
    dataset::{OVERALL_SCORE_COLUMN, WEIGHTED_PREFIX},
    error::DashboardError,
    io::csv::{read_csv, read_csv_string},
};

pub const DICTIONARY_NAME_COLUMN: &str = "weighted_2024_VARIABLE_NAME";
pub const DICTIONARY_DESCRIPTION_COLUMN: &str = "2024_DESCRIPTION";
pub const MISSING_DESCRIPTION: &str = "No description available for this indicator.";

/// Display label for every `weighted_*` column, in input order.
/// Other columns are left out.
pub fn generate_column_mapping<S: AsRef<str>>(columns: &[S]) -> Vec<(String, String)> {
    columns.iter()
        .map(AsRef::as_ref)
        .filter_map(|column| {
            let stem = column.strip_prefix(WEIGHTED_PREFIX)?;
            Some((column.to_string(), title_case(&stem.replace('_', " "))))
        })
        .collect()
}

/// Upper-case each letter that follows a non-letter, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter { out.extend(c.to_lowercase()) } else { out.extend(c.to_uppercase()) }
        } else {
            out.push(c);
        }
        prev_is_letter = c.is_alphabetic();
    }
    out
}

/// Move `name` to the front, keeping the order of the rest. No-op when absent.
pub fn move_column_to_front(mut columns: Vec<String>, name: &str) -> Vec<String> {
    if let Some(pos) = columns.iter().position(|column| column == name) {
        let column = columns.remove(pos);
        columns.insert(0, column);
    }
    columns
}

/// A selectable HHI indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    /// Raw column name, e.g. `weighted_P_AGE65`.
    pub column: String,
    /// Human label, e.g. `P Age65`.
    pub display: String,
}

impl Indicator {
    /// Tooltip alias: the column name without its prefix.
    pub fn alias(&self) -> &str {
        self.column.strip_prefix(WEIGHTED_PREFIX).unwrap_or(&self.column)
    }
}

/// The indicators available in one dataset, overall score first.
#[derive(Debug, Clone, Default)]
pub struct IndicatorCatalog {
    indicators: Vec<Indicator>,
}

impl IndicatorCatalog {
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut labels: AHashMap<String, String> = AHashMap::new();
        let mut order = Vec::new();
        for (column, display) in generate_column_mapping(columns) {
            order.push(column.clone());
            labels.insert(column, display);
        }

        let indicators = move_column_to_front(order, OVERALL_SCORE_COLUMN)
            .into_iter()
            .filter_map(|column| {
                let display = labels.remove(&column)?;
                Some(Indicator { column, display })
            })
            .collect();
        Self { indicators }
    }

    #[inline] pub fn len(&self) -> usize { self.indicators.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.indicators.is_empty() }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Indicator> { self.indicators.iter() }

    /// First entry, the default selection.
    #[inline] pub fn default_indicator(&self) -> Option<&Indicator> { self.indicators.first() }

    /// Look up by raw column name or display label.
    pub fn find(&self, name: &str) -> Option<&Indicator> {
        let name = name.trim();
        self.indicators.iter().find(|i| i.column == name)
            .or_else(|| self.indicators.iter().find(|i| i.display.eq_ignore_ascii_case(name)))
    }

    /// The requested indicator, or the default when none or an unknown one is requested.
    /// The second value names an unknown request.
    pub fn resolve(&self, requested: Option<&str>) -> Result<(&Indicator, Option<String>), DashboardError> {
        let default = self.default_indicator()
            .ok_or_else(|| DashboardError::EmptyResult("The dataset has no HHI indicator columns.".into()))?;
        match requested.map(str::trim).filter(|r| !r.is_empty()) {
            None => Ok((default, None)),
            Some(name) => match self.find(name) {
                Some(indicator) => Ok((indicator, None)),
                None => Ok((default, Some(format!("Unknown indicator {name:?}; showing {}", default.display)))),
            },
        }
    }
}

/// Indicator descriptions from the HHI data dictionary.
#[derive(Debug, Clone, Default)]
pub struct IndicatorDictionary {
    descriptions: AHashMap<String, String>,
}

impl IndicatorDictionary {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let names = df.column(DICTIONARY_NAME_COLUMN)
            .with_context(|| format!("[indicator] Dictionary has no '{DICTIONARY_NAME_COLUMN}' column"))?
            .cast(&DataType::String)?;
        let descriptions = df.column(DICTIONARY_DESCRIPTION_COLUMN)
            .with_context(|| format!("[indicator] Dictionary has no '{DICTIONARY_DESCRIPTION_COLUMN}' column"))?
            .cast(&DataType::String)?;

        let mut map = AHashMap::with_capacity(df.height());
        for (name, description) in names.str()?.into_iter().zip(descriptions.str()?.into_iter()) {
            if let (Some(name), Some(description)) = (name, description) {
                // First row wins on duplicates.
                map.entry(name.trim().to_string()).or_insert_with(|| description.trim().to_string());
            }
        }
        Ok(Self { descriptions: map })
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        let dictionary = Self::from_frame(&read_csv(path)?)?;
        tracing::info!("[indicator] Loaded {} indicator descriptions from {}", dictionary.len(), path.display());
        Ok(dictionary)
    }

    pub fn from_csv_str(csv: &str) -> Result<Self> {
        Self::from_frame(&read_csv_string(csv)?)
    }

    #[inline] pub fn len(&self) -> usize { self.descriptions.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.descriptions.is_empty() }

    pub fn lookup(&self, column: &str) -> Result<&str, DashboardError> {
        self.descriptions.get(column)
            .map(String::as_str)
            .ok_or_else(|| DashboardError::MissingDescription(column.to_string()))
    }

    /// Description for `column`, or the placeholder text.
    pub fn describe(&self, column: &str) -> &str {
        self.lookup(column).unwrap_or_else(|err| {
            tracing::debug!("{err}");
            MISSING_DESCRIPTION
        })
    }
}

/// One step of the NWS HeatRisk scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskLevel {
    pub level: u8,
    pub name: &'static str,
    pub description: &'static str,
}

pub const HEAT_RISK_LEVELS: [RiskLevel; 5] = [
    RiskLevel {
        level: 0,
        name: "None",
        description: "Little to no risk from expected heat.",
    },
    RiskLevel {
        level: 1,
        name: "Minor",
        description: "This level of heat affects primarily those individuals extremely sensitive to heat, \
            especially when outdoors without effective cooling and/or adequate hydration.",
    },
    RiskLevel {
        level: 2,
        name: "Moderate",
        description: "This level of heat affects most individuals sensitive to heat, especially those without \
            effective cooling and/or adequate hydration. Impacts possible in some health systems and in \
            heat-sensitive industries.",
    },
    RiskLevel {
        level: 3,
        name: "Major",
        description: "This level of heat affects anyone without effective cooling and/or adequate hydration. \
            Impacts likely in some health systems, heat-sensitive industries, and infrastructure.",
    },
    RiskLevel {
        level: 4,
        name: "Extreme",
        description: "This level of rare and/or long-duration extreme heat with little to no overnight relief \
            affects anyone without effective cooling and/or adequate hydration. Impacts likely in most health \
            systems, heat-sensitive industries, and infrastructure.",
    },
];
