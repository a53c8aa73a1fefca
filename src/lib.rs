pub mod config;
pub mod leaderboard;
pub mod logging;
pub mod output;
pub mod scoring;
pub mod table;
