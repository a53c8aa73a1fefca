use std::collections::BTreeSet;

use super::config::ScoringConfig;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    // Weights must be usable multipliers
    for (column, weight) in config.weights.iter() {
        if !weight.is_finite() || *weight < 0.0 {
            errors.push(format!(
                "scoring.weights.{}: must be a non-negative number, got {}",
                column, weight
            ));
        }
    }

    // A column cannot be forced both ways
    for column in config.polarity.negative.intersection(&config.polarity.positive) {
        errors.push(format!(
            "scoring.polarity: '{}' is listed as both negative and positive",
            column
        ));
    }

    for (column, offset) in &config.offsets {
        if !offset.is_finite() {
            errors.push(format!("scoring.offsets.{}: must be a finite number", column));
        }
    }

    if !config.cycle_penalty.is_finite() {
        errors.push("scoring.cycle_penalty: must be a finite number".to_string());
    }

    // Column specs
    let columns = &config.columns;
    if columns.mechanical.is_empty() {
        errors.push("scoring.columns.mechanical: must name at least one column".to_string());
    }
    if columns.behavioral.len() != 4 {
        errors.push(format!(
            "scoring.columns.behavioral: expected a key column plus 3 metrics, got {} columns",
            columns.behavioral.len()
        ));
    }
    if columns.dumper.len() != 5 {
        errors.push(format!(
            "scoring.columns.dumper: expected a key column plus 4 metrics (TTH, TL, HT, ET order), got {} columns",
            columns.dumper.len()
        ));
    }

    let behavioral: BTreeSet<&String> = columns.behavioral_metrics().iter().collect();
    let dumper: BTreeSet<&String> = columns.dumper_metrics().iter().collect();
    for column in behavioral.intersection(&dumper) {
        errors.push(format!(
            "scoring.columns: '{}' appears in both the behavioral and dumper specs",
            column
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
