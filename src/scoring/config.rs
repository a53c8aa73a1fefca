use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Mean adjustment applied to the `STB` column before weighting.
pub const STB_OFFSET: f64 = -30.0;

/// Calibration constant applied to the mean dumper-cycle ratio.
pub const DEFAULT_CYCLE_PENALTY: f64 = -0.88;

/// Main scoring configuration.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   mode: lenient
///   weights:
///     EFR: 0.2
///     RP: 0.04
///   polarity:
///     negative: [EFR]
///     positive: [RP]
///   offsets:
///     STB: -30
///   cycle_penalty: -0.88
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ScoringConfig {
    /// How anomalies (missing columns, bad cells, empty tables) are handled
    pub mode: ScoreMode,

    /// Column specs for each upload kind
    pub columns: ColumnSpecs,

    /// Weight per canonical column; columns not listed weigh 0
    pub weights: WeightTable,

    /// Which columns are forced negative or positive
    pub polarity: PolarityTable,

    /// Additive adjustment applied to a column's mean before weighting
    pub offsets: BTreeMap<String, f64>,

    /// Multiplier applied to the mean dumper-cycle ratio
    pub cycle_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoreMode::default(),
            columns: ColumnSpecs::default(),
            weights: WeightTable::default(),
            polarity: PolarityTable::default(),
            offsets: BTreeMap::from([("STB".to_string(), STB_OFFSET)]),
            cycle_penalty: DEFAULT_CYCLE_PENALTY,
        }
    }
}

impl ScoringConfig {
    /// Offset for `column`, 0 when none is configured
    pub fn offset(&self, column: &str) -> f64 {
        self.offsets.get(column).copied().unwrap_or(0.0)
    }
}

/// Lenient mode recovers every numeric anomaly locally and logs it.
/// Strict mode reports them as errors instead.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    #[default]
    Lenient,
    Strict,
}

/// Canonical columns expected for each kind of upload.
///
/// The behavioral and dumper specs are positional: the first column holds the
/// entity key and the rest are read in order by the combine-by-key path.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ColumnSpecs {
    pub mechanical: Vec<String>,
    pub behavioral: Vec<String>,
    pub dumper: Vec<String>,
}

impl Default for ColumnSpecs {
    fn default() -> Self {
        Self {
            mechanical: names(&[
                "EFR", "HRTVD", "MET", "ROT", "ES", "OP", "EAPP", "OT", "CBP", "RP", "WBVS",
                "FBP", "CT",
            ]),
            behavioral: names(&["NAME", "ES", "LS", "STB"]),
            dumper: names(&["NAME", "TTH", "TL", "HT", "ET"]),
        }
    }
}

impl ColumnSpecs {
    /// Behavioral metric columns, without the key column
    pub fn behavioral_metrics(&self) -> &[String] {
        self.behavioral.get(1..).unwrap_or(&[])
    }

    /// Dumper metric columns, without the key column
    pub fn dumper_metrics(&self) -> &[String] {
        self.dumper.get(1..).unwrap_or(&[])
    }
}

/// Weight per canonical column.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct WeightTable(pub BTreeMap<String, f64>);

impl WeightTable {
    /// Weight for `column`, 0 when the column is not listed
    pub fn get(&self, column: &str) -> f64 {
        self.0.get(column).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        let weights = [
            // Mechanical
            ("EFR", 0.2),
            ("HRTVD", 0.1),
            ("MET", 0.05),
            ("ROT", 0.1),
            ("ES", 0.1),
            ("OP", 0.05),
            ("EAPP", 0.05),
            ("OT", 0.1),
            ("CBP", 0.05),
            ("RP", 0.04),
            ("WBVS", 0.05),
            ("FBP", 0.05),
            ("CT", 0.06),
            // Behavioral (ES shared with mechanical)
            ("LS", 0.1),
            ("STB", 0.15),
            // Dumper cycle
            ("TTH", 0.05),
            ("TL", 0.05),
            ("HT", 0.02),
            ("ET", 0.02),
        ];
        Self(
            weights
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, f64); N]> for WeightTable {
    fn from(entries: [(&str, f64); N]) -> Self {
        Self(
            entries
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        )
    }
}

/// Sign applied to a weighted column contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Negative,
    Positive,
    Neutral,
}

impl Polarity {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Polarity::Negative => -value.abs(),
            Polarity::Positive => value.abs(),
            Polarity::Neutral => value,
        }
    }
}

/// Columns whose contribution sign is forced. Columns in neither set keep the
/// sign of their weighted mean.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct PolarityTable {
    pub negative: BTreeSet<String>,
    pub positive: BTreeSet<String>,
}

impl PolarityTable {
    pub fn new(negative: &[&str], positive: &[&str]) -> Self {
        Self {
            negative: negative.iter().map(|s| s.to_string()).collect(),
            positive: positive.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Negative wins if a column is (mis)configured in both sets
    pub fn polarity(&self, column: &str) -> Polarity {
        if self.negative.contains(column) {
            Polarity::Negative
        } else if self.positive.contains(column) {
            Polarity::Positive
        } else {
            Polarity::Neutral
        }
    }
}

impl Default for PolarityTable {
    fn default() -> Self {
        Self::new(
            &["EFR", "HRTVD", "ROT", "OT", "WBVS", "CT", "ES", "LS", "STB"],
            &["MET", "OP", "EAPP", "CBP", "RP", "FBP"],
        )
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scoring_config() {
        let config = ScoringConfig::default();

        assert_eq!(config.mode, ScoreMode::Lenient);
        assert_eq!(config.offset("STB"), -30.0);
        assert_eq!(config.offset("ES"), 0.0);
        assert_eq!(config.cycle_penalty, -0.88);
        assert_eq!(config.columns.mechanical.len(), 13);
        assert_eq!(config.columns.behavioral_metrics(), &names(&["ES", "LS", "STB"])[..]);
        assert_eq!(
            config.columns.dumper_metrics(),
            &names(&["TTH", "TL", "HT", "ET"])[..]
        );
    }

    #[test]
    fn test_default_weights_cover_every_default_column() {
        let config = ScoringConfig::default();
        let columns = config
            .columns
            .mechanical
            .iter()
            .chain(config.columns.behavioral_metrics())
            .chain(config.columns.dumper_metrics());
        for column in columns {
            assert!(config.weights.0.contains_key(column), "no weight for {}", column);
        }
    }

    #[test]
    fn test_missing_weight_is_zero() {
        let weights = WeightTable::from([("EFR", 0.2)]);
        assert_eq!(weights.get("EFR"), 0.2);
        assert_eq!(weights.get("XYZ"), 0.0);
    }

    #[test]
    fn test_polarity_apply() {
        assert_eq!(Polarity::Negative.apply(3.0), -3.0);
        assert_eq!(Polarity::Negative.apply(-3.0), -3.0);
        assert_eq!(Polarity::Positive.apply(-0.4), 0.4);
        assert_eq!(Polarity::Neutral.apply(-2.0), -2.0);
    }

    #[test]
    fn test_polarity_lookup() {
        let polarity = PolarityTable::new(&["EFR"], &["RP"]);
        assert_eq!(polarity.polarity("EFR"), Polarity::Negative);
        assert_eq!(polarity.polarity("RP"), Polarity::Positive);
        assert_eq!(polarity.polarity("MET"), Polarity::Neutral);
    }

    #[test]
    fn test_scoring_config_serde_roundtrip() {
        let config = ScoringConfig::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: ScoringConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_scoring_config_parse() {
        let yaml = r#"
mode: strict
weights:
  EFR: 0.5
polarity:
  negative: [EFR]
"#;
        let config: ScoringConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.mode, ScoreMode::Strict);
        assert_eq!(config.weights.get("EFR"), 0.5);
        assert_eq!(config.weights.get("RP"), 0.0);
        assert!(config.polarity.positive.is_empty());
        // Untouched sections keep their defaults
        assert_eq!(config.offset("STB"), -30.0);
        assert_eq!(config.columns, ColumnSpecs::default());
    }

    #[test]
    fn test_empty_scoring_config_parse() {
        let config: ScoringConfig = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config, ScoringConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ScoringConfig, _> = serde_saphyr::from_str("base_score: 100");
        assert!(result.is_err());
    }
}
