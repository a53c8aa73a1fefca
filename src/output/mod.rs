pub mod formatter;
pub mod outcome;

pub use formatter::{
    format_breakdown, format_leaderboard, format_score, format_tsv, should_use_colors,
};
pub use outcome::{to_json_line, CombineOutcome, FailureOutcome, ScoreOutcome};
