use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::frame::DataFrame;
use polars::io::SerWriter;
use polars::prelude::CsvWriter;

/// Write a DataFrame to a CSV file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("Failed to write CSV to {}", path.display()))
}
