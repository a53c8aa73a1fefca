pub mod combine;
pub mod config;
pub mod engine;
pub mod error;
pub mod validation;

pub use combine::{combine_by_key, CombinedScore};
pub use config::*;
pub use engine::{
    cycle_penalty_by_key, cycle_ratio_score, score_entity, weighted_mean_score,
    ColumnContribution, EntityTables, ScoreRequest, ScoreResult, CYCLE_LABEL,
};
pub use error::ScoreError;
pub use validation::validate_scoring;
