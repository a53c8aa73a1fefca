use std::collections::BTreeMap;

use super::config::{ScoreMode, ScoringConfig};
use super::error::ScoreError;
use crate::table::{Cell, MetricTable};

/// Label used for the dumper-cycle term in a score breakdown
pub const CYCLE_LABEL: &str = "TTH*TL/(HT+ET)";

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnContribution {
    pub column: String,  // e.g. "EFR", or CYCLE_LABEL for the dumper term
    pub mean: f64,       // Column mean after any offset
    pub weight: f64,     // Weight (or cycle penalty) applied to the mean
    pub contribution: f64, // Signed value added to the score
    pub clamped: bool,   // Contribution was NaN/infinite and replaced with 0
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub score: f64,
    /// Some expected input was missing or had to be clamped
    pub incomplete: bool,
    pub breakdown: Vec<ColumnContribution>,
}

impl ScoreResult {
    fn empty() -> Self {
        Self {
            score: 0.0,
            incomplete: false,
            breakdown: Vec::new(),
        }
    }

    fn absorb(&mut self, other: ScoreResult) {
        self.score += other.score;
        self.incomplete |= other.incomplete;
        self.breakdown.extend(other.breakdown);
    }
}

/// Tables supplied for one entity. Absent tables contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct EntityTables {
    pub mechanical: Option<MetricTable>,
    pub behavioral: Option<MetricTable>,
    pub dumper: Option<MetricTable>,
}

#[derive(Debug, Clone)]
pub struct ScoreRequest {
    pub entity_name: String,
    pub truck_name: Option<String>,
    pub tables: EntityTables,
}

/// Weighted mean of each expected column, sign-forced by polarity.
///
/// Columns missing from the headers contribute nothing. A NaN produced by an
/// unparseable cell propagates through that column's mean and the column's
/// contribution is then clamped to 0, so one bad column never poisons the
/// whole score.
pub fn weighted_mean_score(
    table: &MetricTable,
    columns: &[String],
    config: &ScoringConfig,
) -> Result<ScoreResult, ScoreError> {
    let strict = config.mode == ScoreMode::Strict;
    let mut result = ScoreResult::empty();

    for column in columns {
        let Some(index) = table.column_index(column) else {
            if strict {
                return Err(ScoreError::MissingColumn(column.clone()));
            }
            tracing::debug!(column = %column, "column not in table headers, skipping");
            result.incomplete = true;
            continue;
        };

        if table.is_empty() {
            if strict {
                return Err(ScoreError::EmptyTable(column.clone()));
            }
            tracing::debug!(column = %column, "table has no rows, column contributes 0");
            result.incomplete = true;
            continue;
        }

        let mut sum = 0.0;
        for row in 0..table.rows.len() {
            let cell = table.cell(row, index);
            let value = cell.to_number();
            if strict && !value.is_finite() {
                return Err(invalid_cell(column, row, &cell));
            }
            sum += value;
        }

        let mean = sum / table.rows.len() as f64 + config.offset(column);
        let weight = config.weights.get(column);
        let signed = config.polarity.polarity(column).apply(mean * weight);
        let (contribution, clamped) = clamp_finite(signed);
        if clamped {
            tracing::warn!(column = %column, "column mean is not a finite number, contributing 0");
            result.incomplete = true;
        }

        result.score += contribution;
        result.breakdown.push(ColumnContribution {
            column: column.clone(),
            mean,
            weight,
            contribution,
            clamped,
        });
    }

    // Finite contributions can still overflow when summed
    let (score, clamped) = clamp_finite(result.score);
    if clamped {
        tracing::warn!("weighted score overflowed, using 0");
    }
    result.score = score;
    result.incomplete |= clamped;

    Ok(result)
}

/// Average dumper-cycle efficiency `(TTH * TL) / (HT + ET)`, scaled by the
/// configured cycle penalty.
///
/// Rows with `HT + ET == 0` count as ratio 0. Rows whose ratio is NaN or
/// infinite are dropped before averaging.
pub fn cycle_ratio_score(
    table: &MetricTable,
    config: &ScoringConfig,
) -> Result<ScoreResult, ScoreError> {
    let strict = config.mode == ScoreMode::Strict;
    let required = config.columns.dumper_metrics();

    let positions: Vec<Option<usize>> = required.iter().map(|c| table.column_index(c)).collect();
    let missing: Vec<String> = required
        .iter()
        .zip(&positions)
        .filter(|(_, pos)| pos.is_none())
        .map(|(name, _)| name.clone())
        .collect();

    let [Some(tth), Some(tl), Some(ht), Some(et)] = positions[..] else {
        if strict {
            return Err(ScoreError::MissingRequiredColumnSet(required_or_missing(
                required, missing,
            )));
        }
        tracing::warn!(
            missing = ?missing,
            "dumper table lacks required columns, cycle score is 0"
        );
        return Ok(ScoreResult {
            score: 0.0,
            incomplete: true,
            breakdown: Vec::new(),
        });
    };

    let mut ratios = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;
    for row in 0..table.rows.len() {
        let read = |col: usize, name: &str| -> Result<f64, ScoreError> {
            let cell = table.cell(row, col);
            let value = cell.to_number();
            if strict && !value.is_finite() {
                return Err(invalid_cell(name, row, &cell));
            }
            Ok(value)
        };
        let haul = read(tth, required[0].as_str())?;
        let load = read(tl, required[1].as_str())?;
        let hauling = read(ht, required[2].as_str())?;
        let empty = read(et, required[3].as_str())?;

        let duration = hauling + empty;
        let ratio = if duration == 0.0 {
            0.0
        } else {
            (haul * load) / duration
        };

        if ratio.is_finite() {
            ratios.push(ratio);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        tracing::warn!(dropped, "dropped dumper rows with a non-finite cycle ratio");
    }

    let mean = if ratios.is_empty() {
        0.0
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    };
    let (contribution, clamped) = clamp_finite(mean * config.cycle_penalty);

    Ok(ScoreResult {
        score: contribution,
        incomplete: dropped > 0 || clamped,
        breakdown: vec![ColumnContribution {
            column: CYCLE_LABEL.to_string(),
            mean,
            weight: config.cycle_penalty,
            contribution,
            clamped,
        }],
    })
}

/// Composite score for one entity: mechanical and behavioral weighted means
/// plus the dumper-cycle term, each over whichever tables were supplied.
pub fn score_entity(
    request: &ScoreRequest,
    config: &ScoringConfig,
) -> Result<ScoreResult, ScoreError> {
    let mut result = ScoreResult::empty();
    let tables = &request.tables;

    if let Some(ref mechanical) = tables.mechanical {
        result.absorb(weighted_mean_score(
            mechanical,
            &config.columns.mechanical,
            config,
        )?);
    }

    if let Some(ref behavioral) = tables.behavioral {
        result.absorb(weighted_mean_score(
            behavioral,
            config.columns.behavioral_metrics(),
            config,
        )?);
    }

    if let Some(ref dumper) = tables.dumper {
        result.absorb(cycle_ratio_score(dumper, config)?);
    }

    let (score, clamped) = clamp_finite(result.score);
    result.score = score;
    result.incomplete |= clamped;

    tracing::debug!(
        entity = %request.entity_name,
        score = result.score,
        terms = result.breakdown.len(),
        "scored entity"
    );

    Ok(result)
}

/// Dumper-cycle score per entity, grouping rows by the key in column 0.
pub fn cycle_penalty_by_key(
    dumper: &MetricTable,
    config: &ScoringConfig,
) -> Result<BTreeMap<String, f64>, ScoreError> {
    let strict = config.mode == ScoreMode::Strict;
    let mut groups: BTreeMap<String, Vec<Vec<Cell>>> = BTreeMap::new();

    for (index, row) in dumper.rows.iter().enumerate() {
        match row.first().and_then(Cell::as_key) {
            Some(key) => groups.entry(key).or_default().push(row.clone()),
            None if strict => {
                return Err(ScoreError::MissingEntityKey {
                    source_table: "dumper",
                    row: index,
                })
            }
            None => tracing::warn!(row = index, "skipping dumper row without an entity key"),
        }
    }

    groups
        .into_iter()
        .map(|(key, rows)| {
            let table = MetricTable::new(dumper.headers.clone(), rows);
            cycle_ratio_score(&table, config).map(|result| (key, result.score))
        })
        .collect()
}

/// Replace NaN and infinities with 0. The flag reports whether it happened.
pub(crate) fn clamp_finite(value: f64) -> (f64, bool) {
    if value.is_finite() {
        (value, false)
    } else {
        (0.0, true)
    }
}

pub(crate) fn invalid_cell(column: &str, row: usize, cell: &Cell) -> ScoreError {
    ScoreError::InvalidNumericCell {
        column: column.to_string(),
        row,
        value: cell.to_string(),
    }
}

fn required_or_missing(required: &[String], missing: Vec<String>) -> Vec<String> {
    // A misconfigured column set (wrong column count) resolves nothing useful
    if missing.is_empty() {
        required.to_vec()
    } else {
        missing
    }
}
