use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::leaderboard::LeaderboardEntry;
use crate::scoring::ScoreResult;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score with two decimals, dropping a trailing ".00".
/// If incomplete is true, appends asterisk to indicate partial scoring
pub fn format_score(score: f64, incomplete: bool) -> String {
    let formatted = format!("{:.2}", score);
    let trimmed = formatted.strip_suffix(".00").unwrap_or(&formatted);
    // "-0" reads as a penalty that isn't there
    let trimmed = if trimmed == "-0" { "0" } else { trimmed };

    if incomplete {
        format!("{}*", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format a leaderboard with columns: Rank, Score, Entity, Truck
/// Rank column: 4 chars (fits "100."), right-aligned
/// Score column is right-aligned, 10 chars wide
pub fn format_leaderboard(entries: &[LeaderboardEntry], use_colors: bool) -> String {
    if entries.is_empty() {
        return "No scores recorded.".to_string();
    }

    let term_width = get_terminal_width();
    let rank_width = 4;
    let score_width = 10;
    let separator = "  ";

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            // 1-based rank, right-aligned with trailing dot
            let rank_str = format!("{:>width$}", format!("{}.", idx + 1), width = rank_width);
            let score_padded = format!(
                "{:>width$}",
                format_score(entry.score, false),
                width = score_width
            );
            let truck = entry.truck_name.as_deref().unwrap_or("");

            let fixed_width = rank_width + 1 + score_width + separator.len() * 2 + truck.chars().count();
            let name = match term_width {
                Some(width) if width > fixed_width + 10 => {
                    truncate_name(&entry.entity_key, width - fixed_width)
                }
                // Very narrow terminal
                Some(_) => truncate_name(&entry.entity_key, 20),
                // No terminal (pipe), don't truncate
                None => entry.entity_key.clone(),
            };

            let line = if use_colors {
                format!(
                    "{} {}{}{}{}{}",
                    rank_str.dimmed(),
                    score_padded.bold(),
                    separator,
                    name,
                    separator,
                    truck.cyan()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}",
                    rank_str, score_padded, separator, name, separator, truck
                )
            };
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a leaderboard as tab-separated values for scripting
/// Columns: rank, score, entity, truck (no headers, no colors)
pub fn format_tsv(entries: &[LeaderboardEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            format!(
                "{}\t{}\t{}\t{}",
                idx + 1,
                entry.score,
                entry.entity_key,
                entry.truck_name.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line breakdown of a score (for verbose mode)
pub fn format_breakdown(result: &ScoreResult, use_colors: bool) -> String {
    if result.breakdown.is_empty() {
        return "  (no columns scored)".to_string();
    }

    result
        .breakdown
        .iter()
        .map(|term| {
            let contribution = format!("{:+.4}", term.contribution);
            let contribution = if use_colors {
                if term.contribution < 0.0 {
                    contribution.red().to_string()
                } else {
                    contribution.green().to_string()
                }
            } else {
                contribution
            };
            let note = if term.clamped { "  (clamped)" } else { "" };
            format!(
                "  {:<16} mean {:>10.4} x {:>7.4} = {}{}",
                term.column, term.mean, term.weight, contribution, note
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
