//! Exporters for consolidated run results.
//!
//! The workbook exporter implements the three spreadsheet layouts; JSON and
//! CSV are thin companions sharing the same entry point.

mod csv;
mod excel;
mod json;

use crate::db::ResultSet;
use crate::error::{PrismaticError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported output formats for `export`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = PrismaticError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(PrismaticError::usage(format!(
                "output format {s} is not implemented"
            ))),
        }
    }
}

impl OutputFormat {
    /// Infers the format from the output path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        if extension.is_empty() {
            return Err(PrismaticError::usage("output format cannot be empty"));
        }

        extension.parse()
    }
}

/// Workbook layout options.
///
/// Both flags set selects the merged layout: one file, one sheet, all
/// connections' rows concatenated with a trailing discriminator column.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub single_file: bool,
    pub single_sheet: bool,
    /// Header of the discriminator column in the merged layout.
    pub connection_column: String,
}

impl ExportOptions {
    /// Builds options from the CLI's negative flags.
    pub fn new(no_single_file: bool, no_single_sheet: bool, connection_column: String) -> Self {
        Self {
            single_file: !no_single_file,
            single_sheet: !no_single_sheet,
            connection_column,
        }
    }
}

/// Exports the consolidated results in the requested format.
pub fn export(
    data: &HashMap<String, ResultSet>,
    output: &Path,
    format: OutputFormat,
    options: &ExportOptions,
) -> Result<()> {
    match format {
        OutputFormat::Xlsx => excel::export(data, output, options),
        OutputFormat::Json => json::export(data, output),
        OutputFormat::Csv => csv::export(data, output),
    }
}

/// Returns the connection names in ascending lexical order.
pub(crate) fn sorted_names(data: &HashMap<String, ResultSet>) -> Vec<&String> {
    let mut names: Vec<&String> = data.keys().collect();
    names.sort();
    names
}

/// Splices `_<name>` into the output path ahead of its extension.
pub(crate) fn splice_connection(path: &Path, name: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let file_name = match path.extension().and_then(|ext| ext.to_str()) {
        Some(extension) => format!("{stem}_{name}.{extension}"),
        None => format!("{stem}_{name}"),
    };

    path.with_file_name(file_name)
}
