use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use haul_rank::leaderboard::{Category, LeaderboardEntry, ScoreRecord};
use haul_rank::output::{CombineOutcome, FailureOutcome, ScoreOutcome};
use haul_rank::scoring::ScoreResult;
use haul_rank::table::MetricTable;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_SCORING: i32 = 1;
const EXIT_STORAGE: i32 = 2;
const EXIT_INPUT: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
enum OutcomeFormat {
    #[default]
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum ListFormat {
    #[default]
    Table,
    Tsv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum Board {
    /// Composite scores from `score`
    Composite,
    /// Mechanical scores from `mechanical`
    Mechanical,
    /// Behavioral + dumper scores from `behavioral`
    Behavioral,
    /// Behavioral and mechanical scores summed per entity
    #[default]
    Combined,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score one entity from any of its tables and record it
    Score {
        /// Entity (operator) name the score is recorded under
        #[arg(long)]
        name: String,
        /// Truck the entity drove
        #[arg(long)]
        truck: Option<String>,
        /// Mechanical metrics table (JSON)
        #[arg(long)]
        mechanical: Option<PathBuf>,
        /// Behavioral metrics table (JSON)
        #[arg(long)]
        behavioral: Option<PathBuf>,
        /// Dumper-cycle table (JSON)
        #[arg(long)]
        dumper: Option<PathBuf>,
        /// Compute and print the score without recording it
        #[arg(long)]
        dry_run: bool,
        #[arg(long, value_enum, default_value_t)]
        format: OutcomeFormat,
    },
    /// Score a mechanical table for one operator and truck
    Mechanical {
        #[arg(long)]
        name: String,
        #[arg(long)]
        truck: String,
        /// Mechanical metrics table (JSON)
        #[arg(long)]
        table: PathBuf,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, value_enum, default_value_t)]
        format: OutcomeFormat,
    },
    /// Score every operator in behavioral and dumper tables, keyed by name
    Behavioral {
        /// Behavioral table; first column holds the operator name
        #[arg(long)]
        behavioral: Option<PathBuf>,
        /// Dumper table; first column holds the operator name
        #[arg(long)]
        dumper: Option<PathBuf>,
        /// Add each operator's dumper-cycle penalty to their score
        #[arg(long)]
        with_cycle_penalty: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, value_enum, default_value_t)]
        format: OutcomeFormat,
    },
    /// Show a ranked leaderboard
    Leaderboard {
        #[arg(value_enum, default_value_t)]
        board: Board,
        /// Maximum rows to show (defaults to the configured limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Show every row, ignoring any limit
        #[arg(long, conflicts_with = "limit")]
        all: bool,
        #[arg(long, value_enum, default_value_t)]
        format: ListFormat,
    },
    /// Write a config file with every default spelled out
    Init {
        /// Overwrite an existing config without asking
        #[arg(long)]
        force: bool,
    },
    /// Check the config and exit
    Validate,
}

#[derive(Parser, Debug)]
#[command(name = "haul-rank")]
#[command(about = "Operator and truck performance leaderboards", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/haul-rank/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the leaderboard store (overrides the config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();
    haul_rank::logging::init(cli.verbose);

    if let Commands::Init { force } = cli.command {
        match haul_rank::config::write_default_config(cli.config, force) {
            Ok(Some(path)) => println!("Config written to {}", path.display()),
            Ok(None) => println!("Aborted."),
            Err(e) => {
                eprintln!("Config error: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
        }
        std::process::exit(EXIT_SUCCESS);
    }

    // Load config
    let config = match haul_rank::config::load_config(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate scoring config at startup
    let scoring = config.scoring.clone().unwrap_or_default();
    if let Err(errors) = haul_rank::scoring::validate_scoring(&scoring) {
        eprintln!("Scoring config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let leaderboard_config = config.leaderboard.clone().unwrap_or_default();
    let store_path = cli
        .store
        .clone()
        .or_else(|| config.store.as_ref().map(PathBuf::from))
        .unwrap_or_else(haul_rank::leaderboard::get_store_path);
    tracing::debug!(store = %store_path.display(), mode = ?scoring.mode, "configuration loaded");

    match cli.command {
        Commands::Score {
            name,
            truck,
            mechanical,
            behavioral,
            dumper,
            dry_run,
            format,
        } => {
            let tables = haul_rank::scoring::EntityTables {
                mechanical: load_optional(mechanical.as_deref(), format),
                behavioral: load_optional(behavioral.as_deref(), format),
                dumper: load_optional(dumper.as_deref(), format),
            };
            if tables.mechanical.is_none() && tables.behavioral.is_none() && tables.dumper.is_none() {
                fail(format, "Provide at least one of --mechanical, --behavioral or --dumper", EXIT_INPUT);
            }

            let request = haul_rank::scoring::ScoreRequest {
                entity_name: name,
                truck_name: truck,
                tables,
            };
            let result = match haul_rank::scoring::score_entity(&request, &scoring) {
                Ok(r) => r,
                Err(e) => fail(format, &format!("Scoring failed: {}", e), EXIT_SCORING),
            };

            let mut record = ScoreRecord::new(request.entity_name.clone(), Category::Composite, result.score);
            record.truck_name = request.truck_name.clone();
            if let Some(source) = [&request.tables.mechanical, &request.tables.behavioral, &request.tables.dumper]
                .into_iter()
                .flatten()
                .next()
            {
                record.source_columns = source.headers.clone();
                record.source_rows = source.rows.clone();
            }
            record.breakdown = contributions(&result);

            persist(&store_path, vec![record], dry_run, format);
            print_score(&request.entity_name, &result, format, cli.verbose);
        }
        Commands::Mechanical {
            name,
            truck,
            table,
            dry_run,
            format,
        } => {
            let table = load_required(&table, format);
            let result = match haul_rank::scoring::weighted_mean_score(
                &table,
                &scoring.columns.mechanical,
                &scoring,
            ) {
                Ok(r) => r,
                Err(e) => fail(format, &format!("Scoring failed: {}", e), EXIT_SCORING),
            };

            let mut record = ScoreRecord::new(name.clone(), Category::Mechanical, result.score);
            record.truck_name = Some(truck);
            record.breakdown = contributions(&result);
            record.source_columns = table.headers;
            record.source_rows = table.rows;

            persist(&store_path, vec![record], dry_run, format);
            print_score(&name, &result, format, cli.verbose);
        }
        Commands::Behavioral {
            behavioral,
            dumper,
            with_cycle_penalty,
            dry_run,
            format,
        } => {
            if behavioral.is_none() && dumper.is_none() {
                fail(format, "Provide --behavioral, --dumper or both", EXIT_INPUT);
            }
            // The combine path reads columns by position; line them up with the configured columns first
            let behavioral = load_optional(behavioral.as_deref(), format)
                .map(|t| t.project(&scoring.columns.behavioral))
                .unwrap_or_default();
            let dumper = load_optional(dumper.as_deref(), format)
                .map(|t| t.project(&scoring.columns.dumper))
                .unwrap_or_default();

            let combined = match haul_rank::scoring::combine_by_key(&behavioral, &dumper, &scoring) {
                Ok(c) => c,
                Err(e) => fail(format, &format!("Scoring failed: {}", e), EXIT_SCORING),
            };
            let penalties = if with_cycle_penalty {
                match haul_rank::scoring::cycle_penalty_by_key(&dumper, &scoring) {
                    Ok(p) => p,
                    Err(e) => fail(format, &format!("Scoring failed: {}", e), EXIT_SCORING),
                }
            } else {
                BTreeMap::new()
            };

            let records: Vec<ScoreRecord> = combined
                .into_iter()
                .map(|scored| {
                    let penalty = penalties.get(&scored.entity_key).copied();
                    let total = scored.score + penalty.unwrap_or(0.0);
                    let total = if total.is_finite() { total } else { 0.0 };
                    let mut record = ScoreRecord::new(scored.entity_key, Category::Behavioral, total);
                    record.breakdown = scored.fields;
                    if let Some(penalty) = penalty {
                        record
                            .breakdown
                            .insert(haul_rank::scoring::CYCLE_LABEL.to_string(), penalty);
                    }
                    record
                })
                .collect();

            let mut entries: Vec<LeaderboardEntry> = records.iter().map(LeaderboardEntry::from).collect();
            haul_rank::leaderboard::rank(&mut entries);

            persist(&store_path, records, dry_run, format);
            match format {
                OutcomeFormat::Json => {
                    println!("{}", haul_rank::output::to_json_line(&CombineOutcome::new(entries)))
                }
                OutcomeFormat::Text => {
                    let use_colors = haul_rank::output::should_use_colors();
                    println!("{}", haul_rank::output::format_leaderboard(&entries, use_colors));
                }
            }
        }
        Commands::Leaderboard {
            board,
            limit,
            all,
            format,
        } => {
            let store = match haul_rank::leaderboard::load_store(&store_path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Storage error: {:#}", e);
                    std::process::exit(EXIT_STORAGE);
                }
            };

            let limit = if all { None } else { limit.or(leaderboard_config.limit) };
            let policy = leaderboard_config.duplicates;
            let entries = match board {
                Board::Composite => store.leaderboard(Category::Composite, policy, limit),
                Board::Mechanical => store.leaderboard(Category::Mechanical, policy, limit),
                Board::Behavioral => store.leaderboard(Category::Behavioral, policy, limit),
                Board::Combined => store.combined(policy, limit),
            };

            match format {
                ListFormat::Table => {
                    let use_colors = haul_rank::output::should_use_colors();
                    println!("{}", haul_rank::output::format_leaderboard(&entries, use_colors));
                }
                ListFormat::Tsv => {
                    let tsv = haul_rank::output::format_tsv(&entries);
                    if !tsv.is_empty() {
                        println!("{}", tsv);
                    }
                }
                ListFormat::Json => match serde_json::to_string_pretty(&entries) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Failed to serialize leaderboard: {}", e);
                        std::process::exit(EXIT_STORAGE);
                    }
                },
            }
        }
        Commands::Validate => {
            println!("Config OK ({:?} mode, store at {})", scoring.mode, store_path.display());
        }
        Commands::Init { .. } => unreachable!("handled before config load"),
    }

    std::process::exit(EXIT_SUCCESS);
}

/// Print a failure in the requested format and exit
fn fail(format: OutcomeFormat, message: &str, code: i32) -> ! {
    match format {
        OutcomeFormat::Json => {
            println!("{}", haul_rank::output::to_json_line(&FailureOutcome::new(message)))
        }
        OutcomeFormat::Text => eprintln!("{}", message),
    }
    std::process::exit(code);
}

fn load_required(path: &Path, format: OutcomeFormat) -> MetricTable {
    match haul_rank::table::load_table(path) {
        Ok(t) => t,
        Err(e) => fail(format, &format!("Input error: {:#}", e), EXIT_INPUT),
    }
}

fn load_optional(path: Option<&Path>, format: OutcomeFormat) -> Option<MetricTable> {
    path.map(|p| load_required(p, format))
}

/// Record the scores unless this is a dry run. A storage failure is
/// reported to the caller, never a panic.
fn persist(store_path: &Path, records: Vec<ScoreRecord>, dry_run: bool, format: OutcomeFormat) {
    if dry_run {
        tracing::debug!(records = records.len(), "dry run, not recording");
        return;
    }
    if let Err(e) = haul_rank::leaderboard::append_records(store_path, records) {
        fail(format, &format!("Failed to save score: {:#}", e), EXIT_STORAGE);
    }
}

/// Column contributions keyed by column; columns scored twice are summed.
/// A sum that overflows is stored as 0 so the store stays readable.
fn contributions(result: &ScoreResult) -> BTreeMap<String, f64> {
    let mut map: BTreeMap<String, f64> = BTreeMap::new();
    for term in &result.breakdown {
        *map.entry(term.column.clone()).or_insert(0.0) += term.contribution;
    }
    for value in map.values_mut().filter(|v| !v.is_finite()) {
        *value = 0.0;
    }
    map
}

fn print_score(name: &str, result: &ScoreResult, format: OutcomeFormat, verbose: bool) {
    match format {
        OutcomeFormat::Json => {
            println!("{}", haul_rank::output::to_json_line(&ScoreOutcome::new(result.score)))
        }
        OutcomeFormat::Text => {
            println!(
                "Score for {}: {}",
                name,
                haul_rank::output::format_score(result.score, result.incomplete)
            );
            if verbose {
                let use_colors = haul_rank::output::should_use_colors();
                println!("{}", haul_rank::output::format_breakdown(result, use_colors));
            }
        }
    }
}
