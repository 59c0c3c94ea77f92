//! CSV exporter.
//!
//! One file per connection, named with the `_<connection>` splice used by
//! the workbook-per-connection layout. NULL renders as an empty field.

use crate::db::{ResultSet, Value};
use crate::error::{PrismaticError, Result};
use crate::export::{sorted_names, splice_connection};
use std::collections::HashMap;
use std::path::Path;

/// Writes one CSV file per connection.
pub fn export(data: &HashMap<String, ResultSet>, output: &Path) -> Result<()> {
    for name in sorted_names(data) {
        let result = &data[name];
        if result.row_count == 0 {
            return Err(PrismaticError::export("no data found"));
        }

        let path = splice_connection(output, name);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| {
            PrismaticError::export(format!("failed to create {}: {e}", path.display()))
        })?;

        let headers: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
        writer
            .write_record(&headers)
            .map_err(|e| PrismaticError::export(format!("failed to write headers: {e}")))?;

        for row in &result.rows {
            let fields: Vec<String> = row.iter().map(render_field).collect();
            writer
                .write_record(&fields)
                .map_err(|e| PrismaticError::export(format!("failed to write row: {e}")))?;
        }

        writer
            .flush()
            .map_err(|e| PrismaticError::export(format!("failed to flush {}: {e}", path.display())))?;
    }

    Ok(())
}

fn render_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_display_string(),
    }
}
