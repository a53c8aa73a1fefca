use serde::{Deserialize, Serialize};
use std::fmt;

/// A single spreadsheet cell as it arrives from an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn empty() -> Self {
        Cell::Empty
    }

    /// True for null cells and blank strings
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Numeric value of the cell. Blank cells are 0, unparseable text is NaN.
    pub fn to_number(&self) -> f64 {
        if self.is_blank() {
            return 0.0;
        }
        match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
            Cell::Empty => 0.0,
        }
    }

    /// Like `to_number`, but anything that does not parse to a finite value is 0.
    pub fn to_number_or_zero(&self) -> f64 {
        let value = self.to_number();
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    /// Entity key carried by this cell, if it has one
    pub fn as_key(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Cell::Number(n) if n.is_finite() => Some(n.to_string()),
            Cell::Number(_) => None,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::empty()
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Empty => Ok(()),
        }
    }
}

/// Header row plus data rows. Rows may be shorter or longer than the header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl MetricTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Position of the first header matching `name` exactly
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (`row`, `col`); out-of-range cells read as empty
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rebuild the table so its headers are exactly `columns`, picking each
    /// cell by header name. Columns the table lacks and short rows become
    /// empty cells, which read as 0 (and as no key).
    pub fn project(&self, columns: &[String]) -> MetricTable {
        let positions: Vec<Option<usize>> =
            columns.iter().map(|c| self.column_index(c)).collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|pos| pos.and_then(|p| row.get(p)).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        MetricTable {
            headers: columns.to_vec(),
            rows,
        }
    }
}
