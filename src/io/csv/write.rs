//! CSV writing operations.

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::CsvWriter};

/// Write a DataFrame to CSV bytes.
pub(crate) fn write_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    CsvWriter::new(&mut out)
        .finish(&mut df.clone())
        .context("[io::csv::write] Failed to write CSV to bytes")?;
    Ok(out)
}
