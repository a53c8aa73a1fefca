use std::cmp::Ordering;
use std::collections::HashMap;

use super::types::{LeaderboardEntry, ScoreRecord};

/// Merge collections of entries into one ranked list.
///
/// The first entry seen for a key keeps its shape (e.g. its truck name);
/// every later entry for that key adds its score to it. Scores are never
/// overwritten, so the result only depends on the multiset of entries.
pub fn merge_leaderboards<I>(collections: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = Vec<LeaderboardEntry>>,
{
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, LeaderboardEntry> = HashMap::new();

    for collection in collections {
        for entry in collection {
            match merged.get_mut(&entry.entity_key) {
                Some(existing) => existing.score += entry.score,
                None => {
                    order.push(entry.entity_key.clone());
                    merged.insert(entry.entity_key.clone(), entry);
                }
            }
        }
    }

    let mut entries: Vec<LeaderboardEntry> = order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect();
    rank(&mut entries);
    entries
}

/// Sort descending by score. Ties fall back to the entity key so output is
/// stable between runs.
pub fn rank(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| {
        let score_cmp = b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal);
        if score_cmp != Ordering::Equal {
            return score_cmp;
        }
        a.entity_key.cmp(&b.entity_key)
    });
}

/// Keep only the newest record per entity key
pub fn keep_latest(records: Vec<&ScoreRecord>) -> Vec<&ScoreRecord> {
    let mut latest: HashMap<&str, &ScoreRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.entity_key.as_str())
            .and_modify(|current| {
                if record.created_at >= current.created_at {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest.into_values().collect()
}
