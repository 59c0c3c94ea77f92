//! JSON exporter.
//!
//! Serializes the whole result map into one document, keyed by connection
//! name in deterministic order.

use crate::db::ResultSet;
use crate::error::{PrismaticError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes all result sets as a single JSON document.
pub fn export(data: &HashMap<String, ResultSet>, output: &Path) -> Result<()> {
    let ordered: BTreeMap<&String, &ResultSet> = data.iter().collect();

    let file = File::create(output)
        .map_err(|e| PrismaticError::export(format!("failed to create {}: {e}", output.display())))?;

    serde_json::to_writer_pretty(BufWriter::new(file), &ordered)
        .map_err(|e| PrismaticError::export(format!("failed to write JSON: {e}")))
}
