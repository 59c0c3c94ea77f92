//! Workbook exporter.
//!
//! Three layouts over the same sheet writer: one sheet per connection, one
//! workbook per connection, or everything merged into a single sheet with a
//! discriminator column naming the source connection.

use crate::db::{Column, ResultSet, Value};
use crate::error::{PrismaticError, Result};
use crate::export::{sorted_names, splice_connection, ExportOptions};
use rust_xlsxwriter::{Format, Table, TableColumn, TableStyle, Workbook, Worksheet, XlsxError};
use std::collections::HashMap;
use std::path::Path;

/// Sheet name used by the single-sheet layouts.
const SHEET_NAME: &str = "Dados";

/// Normalized scan-type names that receive the two-decimal number style.
const NUMBER_TYPES: [&str; 10] = [
    "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64", "float32", "float64",
];

/// Built-in short-date number format.
const DATE_FORMAT_INDEX: u8 = 14;

/// Cell styles, created once per workbook.
struct SheetStyles {
    number: Format,
    date: Format,
    discriminator: Format,
}

impl SheetStyles {
    fn new() -> Self {
        Self {
            number: Format::new().set_num_format("0.00"),
            date: Format::new().set_num_format_index(DATE_FORMAT_INDEX),
            discriminator: Format::new().set_bold(),
        }
    }
}

fn xlsx_err(e: XlsxError) -> PrismaticError {
    PrismaticError::export(e.to_string())
}

/// Writes the consolidated results to one of the three workbook layouts.
pub fn export(
    data: &HashMap<String, ResultSet>,
    output: &Path,
    options: &ExportOptions,
) -> Result<()> {
    match (options.single_file, options.single_sheet) {
        (true, false) => sheet_per_connection(data, output),
        (false, true) => workbook_per_connection(data, output),
        _ => merged(data, output, options),
    }
}

/// One workbook, one sheet per connection (sheet name = connection name).
fn sheet_per_connection(data: &HashMap<String, ResultSet>, output: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let styles = SheetStyles::new();

    for name in sorted_names(data) {
        let result = &data[name];
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name.as_str()).map_err(xlsx_err)?;

        let mut widths = HashMap::new();
        write_data_to_sheet(worksheet, &styles, 0, name, result, None, "", true, &mut widths)?;
        apply_widths(worksheet, &widths)?;
        freeze_header(worksheet)?;
    }

    workbook.save(output).map_err(xlsx_err)
}

/// One workbook per connection, each with a single `Dados` sheet. The
/// connection name is spliced into the output path before its extension.
fn workbook_per_connection(data: &HashMap<String, ResultSet>, output: &Path) -> Result<()> {
    for name in sorted_names(data) {
        let result = &data[name];
        let mut workbook = Workbook::new();
        let styles = SheetStyles::new();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME).map_err(xlsx_err)?;

        let mut widths = HashMap::new();
        write_data_to_sheet(
            worksheet,
            &styles,
            0,
            SHEET_NAME,
            result,
            None,
            "",
            true,
            &mut widths,
        )?;
        apply_widths(worksheet, &widths)?;
        freeze_header(worksheet)?;

        workbook.save(&splice_connection(output, name)).map_err(xlsx_err)?;
    }

    Ok(())
}

/// One workbook, one sheet, every connection's rows concatenated in
/// name-sorted order with a trailing discriminator column.
fn merged(data: &HashMap<String, ResultSet>, output: &Path, options: &ExportOptions) -> Result<()> {
    let mut workbook = Workbook::new();
    let styles = SheetStyles::new();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME).map_err(xlsx_err)?;

    let names = sorted_names(data);
    let mut widths: HashMap<u16, f64> = HashMap::new();
    let mut current_row: u32 = 0;

    for (k, name) in names.iter().enumerate() {
        let result = &data[*name];
        // The table is declared exactly once, over the final range.
        let add_table = k == names.len() - 1;

        write_data_to_sheet(
            worksheet,
            &styles,
            current_row,
            SHEET_NAME,
            result,
            Some(name.as_str()),
            &options.connection_column,
            add_table,
            &mut widths,
        )?;

        current_row += result.row_count as u32;
    }

    apply_widths(worksheet, &widths)?;
    freeze_header(worksheet)?;
    workbook.save(output).map_err(xlsx_err)
}

/// Writes one connection's rows starting at `start_row`.
///
/// Headers are emitted only by the first call (`start_row == 0`). When
/// `connection` is set, a virtual discriminator column is appended to a
/// defensive copy of the column list and filled with the connection name.
/// Column widths accumulate into `widths` across calls.
#[allow(clippy::too_many_arguments)]
fn write_data_to_sheet(
    worksheet: &mut Worksheet,
    styles: &SheetStyles,
    start_row: u32,
    sheet_name: &str,
    data: &ResultSet,
    connection: Option<&str>,
    connection_column: &str,
    add_table: bool,
    widths: &mut HashMap<u16, f64>,
) -> Result<()> {
    if data.row_count == 0 {
        return Err(PrismaticError::export("no data found"));
    }

    let mut columns: Vec<Column> = data.columns.clone();
    if connection.is_some() {
        columns.push(Column::new(columns.len(), connection_column, "string"));
    }
    let discriminator_index = connection.is_some().then(|| columns.len() - 1);

    if start_row == 0 {
        for (j, column) in columns.iter().enumerate() {
            worksheet
                .write(0, j as u16, column.name.as_str())
                .map_err(xlsx_err)?;
            track_width(widths, j as u16, &column.name);
        }
    }

    let column_styles: Vec<Option<&Format>> = columns
        .iter()
        .enumerate()
        .map(|(j, column)| {
            if discriminator_index == Some(j) {
                Some(&styles.discriminator)
            } else if NUMBER_TYPES.contains(&column.type_name.as_str()) {
                Some(&styles.number)
            } else if column.type_name == "Time" {
                Some(&styles.date)
            } else {
                None
            }
        })
        .collect();

    for (i, row) in data.rows.iter().enumerate() {
        let excel_row = start_row + 1 + i as u32;

        for j in 0..columns.len() {
            let discriminator_value;
            let value = if discriminator_index == Some(j) {
                discriminator_value = Value::String(connection.unwrap_or_default().to_string());
                &discriminator_value
            } else {
                &row[j]
            };

            write_cell(worksheet, excel_row, j as u16, value, column_styles[j])?;
            track_width(widths, j as u16, &value.to_display_string());
        }
    }

    if add_table {
        let last_row = start_row + data.row_count as u32;
        let last_col = (columns.len() - 1) as u16;

        let table_columns: Vec<TableColumn> = columns
            .iter()
            .map(|column| TableColumn::new().set_header(column.name.as_str()))
            .collect();

        let table = Table::new()
            .set_name(format!("Tabela_{sheet_name}"))
            .set_style(TableStyle::Medium2)
            .set_banded_rows(true)
            .set_columns(&table_columns);

        worksheet
            .add_table(0, 0, last_row, last_col, &table)
            .map_err(xlsx_err)?;
    }

    Ok(())
}

/// Writes one cell, applying the column style when present.
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: Option<&Format>,
) -> Result<()> {
    let written = match (value, format) {
        (Value::Null, Some(f)) => worksheet.write_blank(row, col, f),
        (Value::Null, None) => return Ok(()),
        (Value::Bool(v), Some(f)) => worksheet.write_with_format(row, col, *v, f),
        (Value::Bool(v), None) => worksheet.write(row, col, *v),
        (Value::Int(v), Some(f)) => worksheet.write_with_format(row, col, *v, f),
        (Value::Int(v), None) => worksheet.write(row, col, *v),
        (Value::Float(v), Some(f)) => worksheet.write_with_format(row, col, *v, f),
        (Value::Float(v), None) => worksheet.write(row, col, *v),
        (Value::String(v), Some(f)) => worksheet.write_with_format(row, col, v.as_str(), f),
        (Value::String(v), None) => worksheet.write(row, col, v.as_str()),
        (Value::Timestamp(v), Some(f)) => worksheet.write_with_format(row, col, v, f),
        (Value::Timestamp(v), None) => worksheet.write(row, col, v),
    };

    written.map(|_| ()).map_err(xlsx_err)
}

/// Tracks the widest rendered string seen per column.
fn track_width(widths: &mut HashMap<u16, f64>, col: u16, rendered: &str) {
    let width = rendered.chars().count() as f64;
    let entry = widths.entry(col).or_insert(0.0);
    if *entry < width {
        *entry = width;
    }
}

fn apply_widths(worksheet: &mut Worksheet, widths: &HashMap<u16, f64>) -> Result<()> {
    for (col, width) in widths {
        worksheet.set_column_width(*col, *width).map_err(xlsx_err)?;
    }
    Ok(())
}

/// Freezes the header row (split below row 1, top-left cell A2).
fn freeze_header(worksheet: &mut Worksheet) -> Result<()> {
    worksheet.set_freeze_panes(1, 0).map(|_| ()).map_err(xlsx_err)
}
