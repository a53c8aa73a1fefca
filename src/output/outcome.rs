use serde::Serialize;

use crate::leaderboard::LeaderboardEntry;

/// Result of scoring a single entity
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreOutcome {
    pub success: bool,
    pub score: f64,
}

/// Result of the combine-by-key path: one entry per entity
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CombineOutcome {
    pub success: bool,
    pub records: Vec<LeaderboardEntry>,
}

/// Failure reported in place of either outcome
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailureOutcome {
    pub success: bool,
    pub message: String,
}

impl ScoreOutcome {
    pub fn new(score: f64) -> Self {
        Self {
            success: true,
            score,
        }
    }
}

impl CombineOutcome {
    pub fn new(records: Vec<LeaderboardEntry>) -> Self {
        Self {
            success: true,
            records,
        }
    }
}

impl FailureOutcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Serialize an outcome as a single JSON line
pub fn to_json_line<T: Serialize>(outcome: &T) -> String {
    serde_json::to_string(outcome)
        .unwrap_or_else(|e| format!(r#"{{"success":false,"message":"{}"}}"#, e))
}
