//! Spell card generator CLI
//!
//! Command-line tool for turning a spell list (CSV or spreadsheet) into printable spell cards.

use clap::Parser;
use spellcard_core::{run, Config, DocumentFormat, RunReport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spellcards")]
#[command(about = "Generate printable spell cards from a spell list", long_about = None)]
#[command(version)]
struct Cli {
    /// Only report how many cards would be generated
    #[arg(short, long)]
    preview: bool,

    /// Classes to include (comma-separated, e.g. "wizard,cleric")
    #[arg(short, long)]
    classes: Option<String>,

    /// Levels to include (comma-separated, 0 or "cantrip" for cantrips)
    #[arg(short, long)]
    levels: Option<String>,

    /// Spell list CSV, XLSX, XLS or ODS [default: ./spell_list_inputs.csv]
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// Output root; cards go to <dir>/<level>/ [default: ./output/cards]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Directory of <name>_table<n>.html fragments [default: ./resources/tables]
    #[arg(short, long)]
    tables_dir: Option<PathBuf>,

    /// Output format (fodt or json) [default: fodt]
    #[arg(short, long)]
    format: Option<String>,

    /// Load settings from a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a config template (with any flags given) and exit
    #[arg(long)]
    init_config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run_cli(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    // RUST_LOG overrides the flags
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run_cli(cli: Cli) -> spellcard_core::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    apply_flags(&mut config, &cli)?;
    log::debug!("effective config: {:?}", config);

    if let Some(path) = &cli.init_config {
        config.save(path)?;
        println!("Created config template: {}", path.display());
        return Ok(());
    }

    // Reject bad filter tokens before touching the input
    let criteria = config.criteria()?;
    let options = config.run_options(cli.preview);

    let report = run(&options, &criteria)?;
    print_report(&report, &options.output_dir);

    Ok(())
}

/// Command-line flags win over the config file
fn apply_flags(config: &mut Config, cli: &Cli) -> spellcard_core::Result<()> {
    if let Some(input) = &cli.input_file {
        config.input = input.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &cli.tables_dir {
        config.tables_dir = dir.clone();
    }
    if let Some(format) = &cli.format {
        config.format = format.parse::<DocumentFormat>()?;
    }
    if cli.classes.is_some() {
        config.classes = cli.classes.clone();
    }
    if cli.levels.is_some() {
        config.levels = cli.levels.clone();
    }
    Ok(())
}

fn print_report(report: &RunReport, output_dir: &std::path::Path) {
    if report.preview {
        println!(
            "Preview: {} of {} spells match",
            report.selected, report.total_records
        );
        for (level, count) in &report.by_level {
            println!("  {:<8} {}", level.label(), count);
        }
        return;
    }

    let elapsed = report.finished_at - report.started_at;
    println!(
        "Generated {} card(s) in {} ({} selected of {}, {} ms)",
        report.written.len(),
        output_dir.display(),
        report.selected,
        report.total_records,
        elapsed.num_milliseconds()
    );

    if !report.with_tables.is_empty() {
        println!();
        println!("Cards with tables ({}):", report.with_tables.len());
        for name in &report.with_tables {
            println!("  {}", name);
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!("Skipped ({}):", report.skipped.len());
        for (name, reason) in &report.skipped {
            println!("  {}: {}", name, reason);
        }
    }
}
