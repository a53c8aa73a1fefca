use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::types::{Cell, MetricTable};

/// Accepted table file layouts.
///
/// Either an object with explicit headers:
/// ```json
/// { "headers": ["NAME", "ES"], "rows": [["Ravi", 3]] }
/// ```
/// or a plain grid whose first row is the header, as produced by a
/// spreadsheet "sheet to rows" export:
/// ```json
/// [["NAME", "ES"], ["Ravi", 3]]
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TableFile {
    Structured(MetricTable),
    Grid(Vec<Vec<Cell>>),
}

/// Parse a table from JSON text
pub fn parse_table(content: &str) -> Result<MetricTable> {
    let file: TableFile =
        serde_json::from_str(content).context("Table must be an object with headers/rows or a grid of rows")?;

    match file {
        TableFile::Structured(table) => Ok(table),
        TableFile::Grid(mut grid) => {
            if grid.is_empty() {
                bail!("Table grid is empty; the first row must hold the column headers");
            }
            let header_row = grid.remove(0);
            let headers = header_row.iter().map(|cell| cell.to_string()).collect();
            Ok(MetricTable::new(headers, grid))
        }
    }
}

/// Load a table from a JSON file
pub fn load_table(path: &Path) -> Result<MetricTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read table file at {}", path.display()))?;

    let table = parse_table(&content)
        .with_context(|| format!("Failed to parse table in {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "loaded table"
    );

    Ok(table)
}
