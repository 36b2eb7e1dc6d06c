//! CSV reading operations.

use std::{fs::File, io::Cursor, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::CsvReader};

/// Reads a CSV file from `path` into a Polars DataFrame.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReader::new(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Reads a CSV from a string.
pub(crate) fn read_csv_string(csv: &str) -> Result<DataFrame> {
    CsvReader::new(Cursor::new(csv.as_bytes()))
        .finish()
        .with_context(|| "[io::csv::read] Failed to read CSV from string")
}
