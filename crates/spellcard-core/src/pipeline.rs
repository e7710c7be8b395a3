//! Batch orchestration: load, select, render and commit

use crate::card::build_card;
use crate::config::{DEFAULT_INPUT, DEFAULT_OUTPUT_DIR, DEFAULT_TABLES_DIR};
use crate::error::Result;
use crate::filter::{select, FilterCriteria};
use crate::fragment::TableLoader;
use crate::parser::parse_spells;
use crate::spell::{Level, SpellRecord};
use crate::writer::{commit, DocumentFormat, DocumentWriter};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where to read from and write to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub tables_dir: PathBuf,
    pub format: DocumentFormat,
    /// Only count matches, write nothing
    pub preview: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tables_dir: PathBuf::from(DEFAULT_TABLES_DIR),
            format: DocumentFormat::default(),
            preview: false,
        }
    }
}

/// Outcome of one batch
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Data rows read from the input
    pub total_records: usize,
    /// Rows that passed the filter
    pub selected: usize,
    pub by_level: BTreeMap<Level, usize>,
    /// Files written, in input order
    pub written: Vec<PathBuf>,
    /// Spell name and reason for every record that could not be rendered
    pub skipped: Vec<(String, String)>,
    /// Spells whose cards include at least one table
    pub with_tables: Vec<String>,
    pub preview: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn new(preview: bool) -> Self {
        let now = Utc::now();
        Self {
            total_records: 0,
            selected: 0,
            by_level: BTreeMap::new(),
            written: Vec::new(),
            skipped: Vec::new(),
            with_tables: Vec::new(),
            preview,
            started_at: now,
            finished_at: now,
        }
    }
}

/// Count records per level
pub fn level_breakdown(records: &[&SpellRecord]) -> BTreeMap<Level, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.level).or_insert(0) += 1;
    }
    counts
}

/// Run a full batch from the input file
pub fn run(options: &RunOptions, criteria: &FilterCriteria) -> Result<RunReport> {
    let records = parse_spells(&options.input)?;
    log::debug!(
        "read {} records from {}",
        records.len(),
        options.input.display()
    );

    if options.preview {
        return run_records(&records, options, criteria, None);
    }

    let writer = options.format.writer();
    run_records(&records, options, criteria, Some(writer.as_ref()))
}

/// Run a batch over already-parsed records
///
/// With no writer, or with `options.preview` set, only the counts are filled in.
pub fn run_records(
    records: &[SpellRecord],
    options: &RunOptions,
    criteria: &FilterCriteria,
    writer: Option<&dyn DocumentWriter>,
) -> Result<RunReport> {
    let mut report = RunReport::new(options.preview);
    report.total_records = records.len();

    let selected = select(records, criteria);
    report.selected = selected.len();
    report.by_level = level_breakdown(&selected);

    if selected.is_empty() {
        log::warn!("no spells matched the given filters");
    }

    let writer = match writer {
        Some(writer) if !options.preview => writer,
        _ => {
            report.finished_at = Utc::now();
            return Ok(report);
        }
    };

    let loader = TableLoader::new(&options.tables_dir);
    let total = selected.len();

    for (i, record) in selected.into_iter().enumerate() {
        log::info!(
            "[{}/{}]: Level {} spell, '{}' - generating...",
            i + 1,
            total,
            record.level,
            record.name
        );

        match render_one(record, &loader, &options.output_dir, writer) {
            Ok((path, has_tables)) => {
                if has_tables {
                    report.with_tables.push(record.name.clone());
                }
                report.written.push(path);
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("skipping '{}': {}", record.name, e);
                report.skipped.push((record.name.clone(), e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    report.finished_at = Utc::now();
    Ok(report)
}

fn render_one(
    record: &SpellRecord,
    loader: &TableLoader,
    output_dir: &Path,
    writer: &dyn DocumentWriter,
) -> Result<(PathBuf, bool)> {
    let card = build_card(record, loader)?;
    let path = commit(&card, output_dir, writer)?;
    Ok((path, !card.tables.is_empty()))
}
