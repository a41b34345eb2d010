// Tally CLI - config-driven two-source reconciliation
// JSON goes to stdout, human summaries to stderr, so pipes stay clean.

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};

use tally_recon::engine::{apply_normalization, load_csv_table};
use tally_recon::normalize::suggest_normalizations;
use tally_recon::{MatchConfig, ReconError, Table};

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_UNMATCHED, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Match transaction records across two sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  tally run recon.toml
  tally run recon.toml --json
  tally run recon.toml --output result.json
  tally run recon.toml --a bank.csv --b ledger.csv")]
    Run {
        /// Path to the .toml config file
        config: PathBuf,

        /// Source A CSV (overrides [source_a] in the config)
        #[arg(long)]
        a: Option<PathBuf>,

        /// Source B CSV (overrides [source_b] in the config)
        #[arg(long)]
        b: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a config without running
    #[command(after_help = "\
Examples:
  tally validate recon.toml")]
    Validate {
        /// Path to the .toml config file
        config: PathBuf,
    },

    /// Suggest normalization groups for one column across both sources
    #[command(after_help = "\
Examples:
  tally suggest recon.toml Vendor
  tally suggest recon.toml Vendor --threshold 0.9")]
    Suggest {
        /// Path to the .toml config file (supplies the source files)
        config: PathBuf,

        /// Column to scan for near-duplicate values
        column: String,

        /// Minimum similarity for two values to group (default 0.85)
        #[arg(long)]
        threshold: Option<f64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, a, b, json, output } => cmd_run(config, a, b, json, output),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Suggest { config, column, threshold } => cmd_suggest(config, column, threshold),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Error plumbing
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    fn runtime(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, msg)
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let code = match err {
            ReconError::Io(_) => EXIT_RUNTIME,
            _ => EXIT_INVALID_CONFIG,
        };
        Self::new(code, err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_run(
    config_path: PathBuf,
    a_override: Option<PathBuf>,
    b_override: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let mut table_a = load_side(base_dir, a_override, config.source_a.as_ref(), "A", "--a")?;
    let mut table_b = load_side(base_dir, b_override, config.source_b.as_ref(), "B", "--b")?;

    let start = Instant::now();
    apply_normalization(&config, &mut table_a, &mut table_b);
    let result = tally_recon::run(&config, &table_a, &table_b)?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let report = result.into_report(elapsed_ms);

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &report.result.summary;
    eprintln!(
        "recon '{}': {} matched, {} unmatched in A, {} unmatched in B ({:.1}% match rate, {}ms)",
        report.result.config.name,
        s.matched_count,
        s.unmatched_a_count,
        s.unmatched_b_count,
        s.match_rate * 100.0,
        elapsed_ms,
    );

    if s.unmatched_a_count > 0 || s.unmatched_b_count > 0 {
        return Err(CliError::new(EXIT_UNMATCHED, "unmatched records remain"));
    }

    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: recon '{}' with {} rule(s), min_confidence {}",
        config.name,
        config.rules.len(),
        config.min_confidence,
    );
    Ok(())
}

fn cmd_suggest(
    config_path: PathBuf,
    column: String,
    threshold: Option<f64>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let table_a = load_side(base_dir, None, config.source_a.as_ref(), "A", "--a")?;
    let table_b = load_side(base_dir, None, config.source_b.as_ref(), "B", "--b")?;

    let threshold = match threshold {
        Some(t) => {
            if !t.is_finite() || !(0.0..=1.0).contains(&t) {
                return Err(CliError::usage(format!(
                    "--threshold must be in [0.0, 1.0], got {t}"
                )));
            }
            t
        }
        None => config.normalize.as_ref().map(|n| n.threshold).unwrap_or(0.85),
    };

    if !table_a.headers.iter().any(|h| h == &column)
        && !table_b.headers.iter().any(|h| h == &column)
    {
        return Err(CliError::usage(format!(
            "column '{}' not found in either source",
            column
        ))
        .with_hint(format!(
            "available columns: {}",
            available_columns(&table_a, &table_b).join(", ")
        )));
    }

    let suggestions = suggest_normalizations(&column, &[&table_a, &table_b], threshold);

    let json_str = serde_json::to_string_pretty(&suggestions)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
    println!("{json_str}");

    eprintln!(
        "{} group(s) for column '{}' at threshold {}",
        suggestions.len(),
        column,
        threshold,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Input loading
// ---------------------------------------------------------------------------

fn load_config(config_path: &Path) -> Result<MatchConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::runtime(format!("cannot read config: {e}")))?;
    Ok(MatchConfig::from_toml(&config_str)?)
}

/// Resolve and load one side's CSV. A flag override wins; otherwise the
/// config's source entry, resolved relative to the config file's directory.
fn load_side(
    base_dir: &Path,
    flag_override: Option<PathBuf>,
    source: Option<&tally_recon::config::SourceConfig>,
    side: &str,
    flag: &str,
) -> Result<Table, CliError> {
    let csv_path = match (flag_override, source) {
        (Some(path), _) => path,
        (None, Some(source)) => base_dir.join(&source.file),
        (None, None) => {
            return Err(CliError::usage(format!("no file for source {side}"))
                .with_hint(format!("add a [source_{}] block to the config or pass {flag}", side.to_lowercase())));
        }
    };

    let csv_data = std::fs::read_to_string(&csv_path)
        .map_err(|e| CliError::runtime(format!("cannot read {}: {e}", csv_path.display())))?;

    let filename = csv_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| csv_path.display().to_string());

    Ok(load_csv_table(&filename, &csv_data)?)
}

fn available_columns(table_a: &Table, table_b: &Table) -> Vec<String> {
    let mut columns: Vec<String> = table_a.headers.clone();
    for h in &table_b.headers {
        if !columns.contains(h) {
            columns.push(h.clone());
        }
    }
    columns
}
