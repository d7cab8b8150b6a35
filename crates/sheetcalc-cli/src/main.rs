//! sheetcalc CLI - evaluate formulas and recalculate cell snapshots

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sheetcalc::prelude::*;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetcalc")]
#[command(author, version, about = "Spreadsheet formula evaluation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula and print its display value
    Eval {
        /// Formula to evaluate (input without a leading '=' is printed as-is)
        formula: String,

        /// Cell contents as KEY=RAW, e.g. --cell A1=10 --cell A2==A1*2
        #[arg(short, long = "cell", value_name = "KEY=RAW")]
        cells: Vec<String>,

        /// JSON cell snapshot ({"A1": {"value": "10"}, ...})
        #[arg(long = "cells", value_name = "FILE")]
        snapshot: Option<PathBuf>,

        /// Cell the formula lives in
        #[arg(long, default_value = "A1")]
        at: String,

        #[command(flatten)]
        dates: DateArgs,
    },

    /// Expand a range like A1:C3 into cell keys, row-major
    Range {
        /// Range to expand
        range: String,
    },

    /// Recalculate every formula in a JSON cell snapshot
    Recalc {
        /// Input snapshot file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Recalculation strategy
        #[arg(short, long, value_enum, default_value_t = Mode::Full)]
        mode: Mode,

        /// Cells edited since the last pass (dependents mode only)
        #[arg(long, value_name = "KEY")]
        changed: Vec<String>,

        #[command(flatten)]
        dates: DateArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Evaluate every formula cell against one snapshot
    Full,
    /// Evaluate in dependency order, writing results through
    Dependents,
}

/// Formats used by TODAY() and NOW()
#[derive(Args)]
struct DateArgs {
    /// strftime pattern for TODAY()
    #[arg(long, value_name = "FORMAT")]
    date_format: Option<String>,

    /// strftime pattern for NOW()
    #[arg(long, value_name = "FORMAT")]
    datetime_format: Option<String>,
}

impl DateArgs {
    fn settings(&self) -> EvaluationSettings {
        let mut settings = EvaluationSettings::default();
        if let Some(format) = &self.date_format {
            settings = settings.with_date_format(format.as_str());
        }
        if let Some(format) = &self.datetime_format {
            settings = settings.with_datetime_format(format.as_str());
        }
        settings
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            formula,
            cells,
            snapshot,
            at,
            dates,
        } => eval(&formula, &cells, snapshot.as_deref(), &at, &dates),
        Commands::Range { range } => expand(&range),
        Commands::Recalc {
            input,
            output,
            mode,
            changed,
            dates,
        } => recalc(&input, output.as_deref(), mode, &changed, &dates),
    }
}

fn eval(
    formula: &str,
    cells: &[String],
    snapshot: Option<&Path>,
    at: &str,
    dates: &DateArgs,
) -> Result<()> {
    let mut sheet = match snapshot {
        Some(path) => load_sheet(path)?,
        None => Sheet::new(),
    };

    for assignment in cells {
        let (key, raw) = assignment
            .split_once('=')
            .with_context(|| format!("Expected KEY=RAW, got '{}'", assignment))?;
        sheet
            .set_input(key, raw)
            .with_context(|| format!("Invalid cell '{}'", key))?;
    }

    // Formula cells given on the command line need display values first
    if sheet.iter().any(|(_, _, cell)| cell.is_formula()) {
        sheet
            .calculate_with_options(
                &CalculationOptions::dependents().with_settings(dates.settings()),
            )
            .context("Failed to calculate formulas")?;
    }

    let settings = dates.settings();
    println!("{}", evaluate_formula_with(formula, at, &sheet, &settings));
    Ok(())
}

fn expand(range: &str) -> Result<()> {
    let keys = expand_range(range);
    if keys.is_empty() {
        bail!("'{}' is not a valid range", range);
    }

    let mut stdout = io::stdout().lock();
    for key in keys {
        writeln!(stdout, "{}", key).context("Failed to write to stdout")?;
    }
    Ok(())
}

fn recalc(
    input: &Path,
    output: Option<&Path>,
    mode: Mode,
    changed: &[String],
    dates: &DateArgs,
) -> Result<()> {
    let mut sheet = load_sheet(input)?;

    let options = match mode {
        Mode::Full => CalculationOptions::full_scan(),
        Mode::Dependents => CalculationOptions::dependents(),
    }
    .with_settings(dates.settings());

    let stats = if changed.is_empty() {
        sheet.calculate_with_options(&options)
    } else {
        let changed: Vec<&str> = changed.iter().map(String::as_str).collect();
        sheet.recalculate_after(&changed, &options)
    }
    .context("Failed to calculate formulas")?;

    eprintln!(
        "Calculated {} of {} formulas ({} changed, {} errors)",
        stats.cells_calculated, stats.formula_count, stats.cells_changed, stats.errors
    );
    if stats.circular_references > 0 {
        eprintln!(
            "Warning: {} cells are part of circular references",
            stats.circular_references
        );
    }

    let cells: BTreeMap<&str, &CellData> = sheet.iter().map(|(_, key, cell)| (key, cell)).collect();
    let json = serde_json::to_string_pretty(&cells).context("Failed to serialize cells")?;

    if let Some(output_path) = output {
        std::fs::write(output_path, json + "\n")
            .with_context(|| format!("Failed to write '{}'", output_path.display()))?;
        eprintln!("Wrote {} cells to '{}'", cells.len(), output_path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Load a `{key: CellData}` JSON snapshot, normalizing keys
fn load_sheet(path: &Path) -> Result<Sheet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    let cells: BTreeMap<String, CellData> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse '{}'", path.display()))?;

    let mut sheet = Sheet::new();
    for (key, cell) in cells {
        sheet
            .insert(&key, cell)
            .with_context(|| format!("Invalid cell key '{}' in '{}'", key, path.display()))?;
    }
    Ok(sheet)
}
