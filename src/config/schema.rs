use serde::{Deserialize, Serialize};

use crate::leaderboard::DuplicatePolicy;
use crate::scoring::ScoringConfig;

/// Result cap applied when listing a leaderboard
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,

    #[serde(default)]
    pub leaderboard: Option<LeaderboardConfig>,

    /// Path to the leaderboard store (defaults to ~/.config/haul-rank/leaderboard.json)
    #[serde(default)]
    pub store: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct LeaderboardConfig {
    /// Maximum rows listed per leaderboard; `null` lists everything
    pub limit: Option<usize>,

    /// How repeated scores for one entity are counted
    pub duplicates: DuplicatePolicy,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_LEADERBOARD_LIMIT),
            duplicates: DuplicatePolicy::Sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreMode;

    #[test]
    fn test_empty_config_parse() {
        let config: Config = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
store: /var/lib/haul-rank/leaderboard.json
leaderboard:
  limit: 25
  duplicates: latest
scoring:
  mode: strict
  weights:
    EFR: 0.2
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.store.as_deref(), Some("/var/lib/haul-rank/leaderboard.json"));

        let leaderboard = config.leaderboard.unwrap();
        assert_eq!(leaderboard.limit, Some(25));
        assert_eq!(leaderboard.duplicates, DuplicatePolicy::Latest);

        let scoring = config.scoring.unwrap();
        assert_eq!(scoring.mode, ScoreMode::Strict);
    }

    #[test]
    fn test_leaderboard_defaults() {
        let leaderboard: LeaderboardConfig = serde_saphyr::from_str("duplicates: sum").unwrap();
        assert_eq!(leaderboard.limit, Some(100));
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let result: Result<Config, _> = serde_saphyr::from_str("queries: []");
        assert!(result.is_err());
    }
}
