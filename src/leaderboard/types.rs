use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::table::Cell;

/// Which scoring path produced a record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Composite score of one entity across all supplied tables
    Composite,
    /// Column-weighted score of a mechanical table
    Mechanical,
    /// Combine-by-key score of behavioral + dumper tables
    Behavioral,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Composite => "composite",
            Category::Mechanical => "mechanical",
            Category::Behavioral => "behavioral",
        };
        f.write_str(name)
    }
}

/// How repeated records for one entity within a category are counted
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Every record counts; scores for the same key add up
    #[default]
    Sum,
    /// Only the newest record per key counts
    Latest,
}

/// A persisted score. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    pub entity_key: String,
    pub category: Category,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truck_name: Option<String>,
    /// Header row of the scored table. Composite scores built from several
    /// tables keep only the first one supplied, in mechanical, behavioral,
    /// dumper order; the breakdown still covers every table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_columns: Vec<String>,
    /// Rows of the table named by `source_columns`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_rows: Vec<Vec<Cell>>,
    /// Per-column or per-field values behind the score
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn new(entity_key: impl Into<String>, category: Category, score: f64) -> Self {
        Self {
            entity_key: entity_key.into(),
            category,
            score,
            truck_name: None,
            source_columns: Vec::new(),
            source_rows: Vec::new(),
            breakdown: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}

/// One ranked leaderboard line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub entity_key: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truck_name: Option<String>,
}

impl LeaderboardEntry {
    pub fn new(entity_key: impl Into<String>, score: f64) -> Self {
        Self {
            entity_key: entity_key.into(),
            score,
            truck_name: None,
        }
    }
}

impl From<&ScoreRecord> for LeaderboardEntry {
    fn from(record: &ScoreRecord) -> Self {
        Self {
            entity_key: record.entity_key.clone(),
            score: record.score,
            truck_name: record.truck_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Behavioral).unwrap();
        assert_eq!(json, "\"behavioral\"");
        assert_eq!(Category::Mechanical.to_string(), "mechanical");
    }

    #[test]
    fn test_record_skips_empty_fields() {
        let record = ScoreRecord::new("Ravi", Category::Composite, 1.5);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("truck_name").is_none());
        assert!(json.get("source_rows").is_none());
        assert!(json.get("breakdown").is_none());
        assert_eq!(json["entity_key"], "Ravi");
    }

    #[test]
    fn test_entry_from_record_carries_truck() {
        let mut record = ScoreRecord::new("Ravi", Category::Mechanical, 3.0);
        record.truck_name = Some("T-12".to_string());
        let entry = LeaderboardEntry::from(&record);
        assert_eq!(entry.truck_name.as_deref(), Some("T-12"));
        assert_eq!(entry.score, 3.0);
    }
}
