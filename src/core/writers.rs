//! Writers for loaded samples and interpolated fields.
//!
//! This module provides:
//! - A fixed-width text table of every loaded row
//! - CSV export of an interpolated field, one row per grid node

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use super::loaders::SampleSet;
use crate::processors::interpolation::InterpolatedField;

/// Column headers of the sample table.
pub const TABLE_HEADERS: [&str; 4] = ["Distance", "Depth", "Resistivity", "Conductivity"];

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to flush data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Format every sample as an aligned text table.
///
/// Fields are printed as they were written in the source file.
pub fn format_table(samples: &SampleSet) -> String {
    let rows: Vec<&[String; 4]> = (0..samples.len())
        .filter_map(|i| samples.row_text(i))
        .collect();

    let mut widths = TABLE_HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = TABLE_HEADERS
        .iter()
        .zip(widths.iter())
        .map(|(h, &w)| format!("{:>w$}", h, w = w))
        .collect();
    let _ = writeln!(out, "{}", header.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(widths.iter())
            .map(|(c, &w)| format!("{:>w$}", c, w = w))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  "));
    }

    out
}

/// Write an interpolated field to CSV.
///
/// Creates a CSV file with headers `distance,depth,<quantity>` and one row
/// per grid node in row-major order. Nodes outside the sample hull have an
/// empty value.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `field` - Field to export
///
/// # Errors
///
/// Returns an error if:
/// - Parent directories cannot be created
/// - File cannot be created or written to
pub fn write_field_csv(path: &Path, field: &InterpolatedField) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));

    let path_str = path.display().to_string();
    let csv_err = |e| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer
        .write_record(["distance", "depth", field.quantity.key()])
        .map_err(csv_err)?;

    for ((x, y), value) in field.grid().nodes().zip(field.values().iter()) {
        csv_writer
            .write_record(&[
                format!("{:.6}", x),
                format!("{:.6}", y),
                value.map(|v| format!("{:.6}", v)).unwrap_or_default(),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    log::info!("Grid CSV -> {}", path.display());
    Ok(())
}
