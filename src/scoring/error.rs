//! Scoring anomalies.
//!
//! Only surfaced in strict mode. In lenient mode each of these is recovered
//! where it happens (the affected contribution becomes 0) and logged.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    /// An expected column is not in the table's headers.
    #[error("column '{0}' not found in table headers")]
    MissingColumn(String),

    /// A keyed row has no entity name in its first column.
    #[error("row {row} of the {source_table} table has no entity key")]
    MissingEntityKey { source_table: &'static str, row: usize },

    /// The dumper-cycle ratio needs every one of its columns.
    #[error("dumper table is missing required columns: {}", .0.join(", "))]
    MissingRequiredColumnSet(Vec<String>),

    /// A cell that should be numeric could not be parsed.
    #[error("non-numeric value '{value}' in column '{column}' at row {row}")]
    InvalidNumericCell {
        column: String,
        row: usize,
        value: String,
    },

    /// A column mean was requested over zero rows.
    #[error("column '{0}' has no rows to average")]
    EmptyTable(String),
}
