use std::collections::BTreeMap;

use super::config::{ScoreMode, ScoringConfig};
use super::engine::{clamp_finite, invalid_cell};
use super::error::ScoreError;
use crate::table::{Cell, MetricTable};

/// Per-entity totals merged from the behavioral and dumper tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedScore {
    pub entity_key: String,
    pub score: f64,
    /// Summed field values, e.g. ES, LS, STB, TTH, TL, HT, ET
    pub fields: BTreeMap<String, f64>,
}

/// Merge a behavioral and a dumper table keyed by the entity name in column 0.
///
/// Metric columns are read by position: behavioral columns 1..=3 feed the
/// behavioral metric fields and dumper columns 1..=4 the dumper fields, in
/// the order [`ColumnSpecs`](super::config::ColumnSpecs) names them. Callers
/// project raw uploads onto those columns first (see [`MetricTable::project`])
/// so positions line up.
///
/// Every key seen in either table yields one score, the weighted sum of its
/// fields. Fields a source never touched stay 0.
pub fn combine_by_key(
    behavioral: &MetricTable,
    dumper: &MetricTable,
    config: &ScoringConfig,
) -> Result<Vec<CombinedScore>, ScoreError> {
    let behavioral_fields = config.columns.behavioral_metrics();
    let dumper_fields = config.columns.dumper_metrics();
    let zeroed: BTreeMap<String, f64> = behavioral_fields
        .iter()
        .chain(dumper_fields)
        .map(|field| (field.clone(), 0.0))
        .collect();

    let mut totals: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    accumulate(behavioral, "behavioral", behavioral_fields, config.mode, &zeroed, &mut totals)?;
    accumulate(dumper, "dumper", dumper_fields, config.mode, &zeroed, &mut totals)?;

    let scores = totals
        .into_iter()
        .map(|(entity_key, fields)| {
            let raw: f64 = fields
                .iter()
                .map(|(name, value)| value * config.weights.get(name))
                .sum();
            let (score, clamped) = clamp_finite(raw);
            if clamped {
                tracing::warn!(entity = %entity_key, "combined score is not a finite number, using 0");
            }
            CombinedScore {
                entity_key,
                score,
                fields,
            }
        })
        .collect();

    Ok(scores)
}

fn accumulate(
    table: &MetricTable,
    source_table: &'static str,
    fields: &[String],
    mode: ScoreMode,
    zeroed: &BTreeMap<String, f64>,
    totals: &mut BTreeMap<String, BTreeMap<String, f64>>,
) -> Result<(), ScoreError> {
    for (index, row) in table.rows.iter().enumerate() {
        let Some(key) = row.first().and_then(Cell::as_key) else {
            if mode == ScoreMode::Strict {
                return Err(ScoreError::MissingEntityKey {
                    source_table,
                    row: index,
                });
            }
            tracing::warn!(table = source_table, row = index, "skipping row without an entity key");
            continue;
        };

        let entry = totals.entry(key).or_insert_with(|| zeroed.clone());
        for (offset, field) in fields.iter().enumerate() {
            let cell = row.get(offset + 1).cloned().unwrap_or_default();
            let value = match mode {
                ScoreMode::Strict if !cell.to_number().is_finite() => {
                    return Err(invalid_cell(field, index, &cell));
                }
                _ => cell.to_number_or_zero(),
            };
            let total = entry.entry(field.clone()).or_insert(0.0);
            let (sum, clamped) = clamp_finite(*total + value);
            if clamped {
                tracing::warn!(table = source_table, row = index, field = %field, "field total overflowed, using 0");
            }
            *total = sum;
        }
    }
    Ok(())
}
