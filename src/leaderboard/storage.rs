use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use super::merge::{keep_latest, merge_leaderboards, rank};
use super::types::{Category, DuplicatePolicy, LeaderboardEntry, ScoreRecord};

const STORE_VERSION: u32 = 1;

/// Get the default leaderboard store path (~/.config/haul-rank/leaderboard.json)
pub fn get_store_path() -> PathBuf {
    crate::config::get_config_dir().join("leaderboard.json")
}

/// Every score ever recorded, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardStore {
    pub version: u32,
    #[serde(default)]
    pub records: Vec<ScoreRecord>,
}

impl Default for LeaderboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderboardStore {
    /// Create a new empty store with the current version
    pub fn new() -> Self {
        Self {
            version: STORE_VERSION,
            records: Vec::new(),
        }
    }

    /// Append records; existing records are never modified
    pub fn append(&mut self, records: impl IntoIterator<Item = ScoreRecord>) {
        self.records.extend(records);
    }

    /// Records of one category, after applying the duplicate policy
    pub fn records_in(&self, category: Category, policy: DuplicatePolicy) -> Vec<&ScoreRecord> {
        let records: Vec<&ScoreRecord> = self
            .records
            .iter()
            .filter(|r| r.category == category)
            .collect();
        match policy {
            DuplicatePolicy::Sum => records,
            DuplicatePolicy::Latest => keep_latest(records),
        }
    }

    /// Ranked records of one category, one line per record, capped at `limit`.
    pub fn leaderboard(
        &self,
        category: Category,
        policy: DuplicatePolicy,
        limit: Option<usize>,
    ) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .records_in(category, policy)
            .into_iter()
            .map(LeaderboardEntry::from)
            .collect();
        rank(&mut entries);
        truncate(entries, limit)
    }

    /// Behavioral and mechanical scores merged per entity, summed, ranked.
    pub fn combined(&self, policy: DuplicatePolicy, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let collect = |category: Category| -> Vec<LeaderboardEntry> {
            self.records_in(category, policy)
                .into_iter()
                .map(LeaderboardEntry::from)
                .collect()
        };
        let merged = merge_leaderboards([collect(Category::Behavioral), collect(Category::Mechanical)]);
        truncate(merged, limit)
    }
}

fn truncate(mut entries: Vec<LeaderboardEntry>, limit: Option<usize>) -> Vec<LeaderboardEntry> {
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

/// Load the store from a JSON file
///
/// If the file doesn't exist, returns a new empty store.
/// If the file exists but has an unsupported version, returns an error.
pub fn load_store(path: &Path) -> Result<LeaderboardStore> {
    if !path.exists() {
        return Ok(LeaderboardStore::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open leaderboard store at {}", path.display()))?;

    let store: LeaderboardStore = serde_json::from_reader(file)
        .with_context(|| format!("Failed to load leaderboard store from {}", path.display()))?;

    if store.version != STORE_VERSION {
        anyhow::bail!("Unsupported leaderboard store version: {}", store.version);
    }

    tracing::debug!(path = %path.display(), records = store.records.len(), "loaded leaderboard store");
    Ok(store)
}

/// Save the store to a JSON file atomically
///
/// The file is never left half-written. Creates the parent directory if needed.
pub fn save_store(path: &Path, store: &LeaderboardStore) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, store).context("Failed to serialize leaderboard store")?;

    file.commit().context("Failed to save leaderboard store")?;

    tracing::debug!(path = %path.display(), records = store.records.len(), "saved leaderboard store");
    Ok(())
}

/// Load, append, save. Each call writes one new version of the file.
pub fn append_records(path: &Path, records: Vec<ScoreRecord>) -> Result<()> {
    let mut store = load_store(path)?;
    store.append(records);
    save_store(path, &store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(key: &str, category: Category, score: f64) -> ScoreRecord {
        ScoreRecord::new(key, category, score)
    }

    fn sample_store() -> LeaderboardStore {
        let mut store = LeaderboardStore::new();
        let mut old = record("Ravi", Category::Behavioral, 1.0);
        old.created_at = Utc::now() - Duration::days(1);
        store.append([
            old,
            record("Ravi", Category::Behavioral, 4.0),
            record("Meera", Category::Behavioral, 3.0),
            record("Ravi", Category::Mechanical, 2.0),
            record("Arjun", Category::Mechanical, 6.5),
            record("Meera", Category::Composite, 100.0),
        ]);
        store
    }

    #[test]
    fn test_load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = load_store(&dir.path().join("leaderboard.json")).unwrap();
        assert_eq!(store.version, 1);
        assert!(store.records.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("leaderboard.json");

        let mut store = LeaderboardStore::new();
        let mut scored = record("Ravi", Category::Mechanical, -2.5);
        scored.truck_name = Some("T-12".to_string());
        scored.source_columns = vec!["EFR".to_string()];
        store.append([scored.clone()]);

        save_store(&path, &store).unwrap();
        let loaded = load_store(&path).unwrap();

        assert_eq!(loaded.records, vec![scored]);
    }

    #[test]
    fn test_overflowing_scores_persist_and_reload() {
        use crate::scoring::{combine_by_key, weighted_mean_score, PolarityTable, ScoringConfig, WeightTable};
        use crate::table::{Cell, MetricTable};

        let config = ScoringConfig {
            weights: WeightTable::from([("MET", 1.0), ("OP", 1.0), ("ES", 1.0)]),
            polarity: PolarityTable::new(&[], &["MET", "OP"]),
            ..ScoringConfig::default()
        };

        let mechanical = MetricTable::new(
            vec!["MET".to_string(), "OP".to_string()],
            vec![vec![Cell::from(1.5e308), Cell::from(1.5e308)]],
        );
        let weighted =
            weighted_mean_score(&mechanical, &["MET".to_string(), "OP".to_string()], &config).unwrap();

        let behavioral = MetricTable::new(
            vec!["NAME".to_string(), "ES".to_string()],
            vec![
                vec![Cell::from("Ravi"), Cell::from(1.5e308)],
                vec![Cell::from("Ravi"), Cell::from(1.5e308)],
            ],
        );
        let combined = combine_by_key(&behavioral, &MetricTable::default(), &config).unwrap();

        let mut mech_record = record("Ravi", Category::Mechanical, weighted.score);
        mech_record.truck_name = Some("T-12".to_string());
        let mut behavioral_record = record("Ravi", Category::Behavioral, combined[0].score);
        behavioral_record.breakdown = combined[0].fields.clone();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaderboard.json");
        append_records(&path, vec![mech_record, behavioral_record]).unwrap();

        let loaded = load_store(&path).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert!(loaded.records.iter().all(|r| r.score.is_finite()));
        assert!(loaded.records[1].breakdown.values().all(|v| v.is_finite()));
    }

    #[test]
    fn test_unsupported_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaderboard.json");
        fs::write(&path, r#"{"version": 7, "records": []}"#).unwrap();
        assert!(load_store(&path).is_err());
    }

    #[test]
    fn test_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaderboard.json");
        fs::write(&path, "not json").unwrap();
        assert!(load_store(&path).is_err());
    }

    #[test]
    fn test_append_records_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaderboard.json");

        append_records(&path, vec![record("Ravi", Category::Composite, 1.0)]).unwrap();
        append_records(&path, vec![record("Ravi", Category::Composite, 2.0)]).unwrap();

        let store = load_store(&path).unwrap();
        assert_eq!(store.records.len(), 2);
    }

    #[test]
    fn test_category_leaderboard_sorted_and_limited() {
        let store = sample_store();
        let board = store.leaderboard(Category::Behavioral, DuplicatePolicy::Sum, None);
        let scores: Vec<f64> = board.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![4.0, 3.0, 1.0]);

        let top = store.leaderboard(Category::Behavioral, DuplicatePolicy::Sum, Some(1));
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].score, 4.0);
    }

    #[test]
    fn test_category_leaderboard_latest_policy() {
        let store = sample_store();
        let board = store.leaderboard(Category::Behavioral, DuplicatePolicy::Latest, None);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].entity_key, "Ravi");
        assert_eq!(board[0].score, 4.0);
    }

    #[test]
    fn test_combined_sums_behavioral_and_mechanical() {
        let store = sample_store();
        let board = store.combined(DuplicatePolicy::Sum, None);

        // Ravi: 1 + 4 behavioral + 2 mechanical; composite scores are not part of it
        let pairs: Vec<(&str, f64)> = board
            .iter()
            .map(|e| (e.entity_key.as_str(), e.score))
            .collect();
        assert_eq!(pairs, vec![("Ravi", 7.0), ("Arjun", 6.5), ("Meera", 3.0)]);
    }

    #[test]
    fn test_combined_latest_policy() {
        let store = sample_store();
        let board = store.combined(DuplicatePolicy::Latest, Some(2));
        let pairs: Vec<(&str, f64)> = board
            .iter()
            .map(|e| (e.entity_key.as_str(), e.score))
            .collect();
        assert_eq!(pairs, vec![("Arjun", 6.5), ("Ravi", 6.0)]);
    }
}
