pub mod merge;
pub mod storage;
pub mod types;

pub use merge::{keep_latest, merge_leaderboards, rank};
pub use storage::{append_records, get_store_path, load_store, save_store, LeaderboardStore};
pub use types::{Category, DuplicatePolicy, LeaderboardEntry, ScoreRecord};
